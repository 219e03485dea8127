//! Immutable client configuration with documented defaults.
//!
//! All options are resolved once at construction; there is no dynamic
//! option-object merging at call time. Per-call overrides live on
//! [`RequestIntent`](crate::dispatch::RequestIntent) and
//! [`Pagination`](crate::pages::Pagination) instead.

// std
use std::time::Duration;
// self
use crate::_prelude::*;

/// OAuth2 client credentials supplied at construction and held for the client's lifetime.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
	/// OAuth2 client identifier.
	pub client_id: String,
	/// OAuth2 client secret.
	pub client_secret: String,
	/// Scopes requested by the client-credentials grant and the authorize URL.
	pub scopes: Vec<String>,
}
impl Credentials {
	/// Creates credentials with an empty scope list.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: client_secret.into(), scopes: Vec::new() }
	}

	/// Replaces the requested scopes.
	pub fn with_scopes<S>(mut self, scopes: impl IntoIterator<Item = S>) -> Self
	where
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Space-joined scope value for grant submissions, `None` when no scopes are set.
	pub(crate) fn scope_value(&self) -> Option<String> {
		if self.scopes.is_empty() { None } else { Some(self.scopes.join(" ")) }
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &!self.client_secret.is_empty())
			.field("scopes", &self.scopes)
			.finish()
	}
}

/// Static configuration for one [`ApiClient`](crate::client::ApiClient) instance.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Base URL that relative request paths are joined onto.
	pub base_url: Url,
	/// Token endpoint receiving grant submissions.
	pub token_url: Url,
	/// Authorization endpoint end-users are redirected to.
	pub oauth_url: Url,
	/// Token introspection endpoint, when the remote offers one.
	pub token_info_url: Option<Url>,
	/// Redirect URI used by the authorization-code flow.
	pub redirect_uri: Option<Url>,
	/// Maximum requests admitted per rate window. Defaults to 2.
	pub rate_limit_max_requests: u32,
	/// Length of the fixed rate window. Defaults to 1200 ms.
	pub rate_limit_per: Duration,
	/// Maximum retries after the initial attempt. Defaults to 5.
	pub max_retry: u32,
	/// Emit a log line per request outcome. Defaults to `false`.
	pub log_line: bool,
	/// Include the response body in failure log lines. Defaults to `false`.
	pub err_log_body: bool,
	/// Raise terminal failures instead of resolving to `None`. Defaults to `true`.
	pub raise_on_error: bool,
}
impl ClientConfig {
	/// Default admission budget per rate window.
	pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 2;
	/// Default length of the fixed rate window.
	pub const DEFAULT_RATE_LIMIT_PER: Duration = Duration::from_millis(1200);
	/// Default retry budget after the initial attempt.
	pub const DEFAULT_MAX_RETRY: u32 = 5;

	/// Creates a configuration with default limits for the given endpoints.
	pub fn new(base_url: Url, token_url: Url, oauth_url: Url) -> Self {
		Self {
			base_url,
			token_url,
			oauth_url,
			token_info_url: None,
			redirect_uri: None,
			rate_limit_max_requests: Self::DEFAULT_RATE_LIMIT_MAX_REQUESTS,
			rate_limit_per: Self::DEFAULT_RATE_LIMIT_PER,
			max_retry: Self::DEFAULT_MAX_RETRY,
			log_line: false,
			err_log_body: false,
			raise_on_error: true,
		}
	}

	/// Sets the token introspection endpoint.
	pub fn with_token_info_url(mut self, url: Url) -> Self {
		self.token_info_url = Some(url);

		self
	}

	/// Sets the redirect URI for the authorization-code flow.
	pub fn with_redirect_uri(mut self, uri: Url) -> Self {
		self.redirect_uri = Some(uri);

		self
	}

	/// Overrides the rate window budget (requests per window).
	pub fn with_rate_limit(mut self, max_requests: u32, per: Duration) -> Self {
		self.rate_limit_max_requests = max_requests.max(1);
		self.rate_limit_per = per;

		self
	}

	/// Overrides the retry budget.
	pub fn with_max_retry(mut self, max_retry: u32) -> Self {
		self.max_retry = max_retry;

		self
	}

	/// Enables or disables per-request log lines.
	pub fn with_log_line(mut self, enabled: bool) -> Self {
		self.log_line = enabled;

		self
	}

	/// Enables or disables response bodies in failure log lines.
	pub fn with_err_log_body(mut self, enabled: bool) -> Self {
		self.err_log_body = enabled;

		self
	}

	/// Switches between raising terminal failures (`true`) and swallowing them (`false`).
	pub fn with_raise_on_error(mut self, enabled: bool) -> Self {
		self.raise_on_error = enabled;

		self
	}
}
