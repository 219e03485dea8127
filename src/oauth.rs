//! Authorization-endpoint URL construction for the browser redirect flow.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
// self
use crate::_prelude::*;

const STATE_BYTES: usize = 32;

/// Optional overrides for [`ApiClient::authorize_url`](crate::client::ApiClient::authorize_url).
#[derive(Clone, Debug, Default)]
pub struct AuthorizeOptions {
	/// Opaque state value that must round-trip via the redirect handler.
	/// Generated as 32 random bytes, base64url-encoded, when absent.
	pub state: Option<String>,
	/// Scopes to request instead of the credentials' configured scopes.
	pub scopes: Option<Vec<String>>,
	/// Redirect URI to use instead of the configured one.
	pub redirect_uri: Option<Url>,
}
impl AuthorizeOptions {
	/// Creates empty options that fall back to the client's configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Pins the state value instead of generating one.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Overrides the requested scopes.
	pub fn with_scopes<S>(mut self, scopes: impl IntoIterator<Item = S>) -> Self
	where
		S: Into<String>,
	{
		self.scopes = Some(scopes.into_iter().map(Into::into).collect());

		self
	}

	/// Overrides the redirect URI.
	pub fn with_redirect_uri(mut self, uri: Url) -> Self {
		self.redirect_uri = Some(uri);

		self
	}
}

pub(crate) fn build_authorize_url(
	oauth_url: &Url,
	client_id: &str,
	redirect_uri: &Url,
	scopes: &[String],
	state: &str,
) -> Url {
	let mut url = oauth_url.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());
	pairs.append_pair("response_type", "code");

	if !scopes.is_empty() {
		pairs.append_pair("scope", &scopes.join(" "));
	}

	pairs.append_pair("state", state);

	drop(pairs);

	url
}

pub(crate) fn random_state() -> String {
	let bytes: [u8; STATE_BYTES] = rand::rng().random();

	URL_SAFE_NO_PAD.encode(bytes)
}
