//! The client facade tying configuration, token store, rate gate, and
//! dispatcher together.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::{ClientConfig, Credentials},
	dispatch::{AttemptState, RequestIntent, RetryDispatcher},
	error::ConfigError,
	gate::RateGate,
	http::{ApiResponse, ApiTransport},
	oauth::{self, AuthorizeOptions},
	pages::{self, Pagination},
	token::{TokenPayload, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Authenticated client for one remote REST API.
///
/// One instance owns one cached access token, one rate gate, and one retry
/// policy; everything it issues shares the gate's admission order. The
/// instance is cheap to share behind `Arc` across concurrent callers.
pub struct ApiClient {
	config: ClientConfig,
	tokens: Arc<TokenStore>,
	dispatcher: RetryDispatcher,
}
impl ApiClient {
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		credentials: Credentials,
		transport: Arc<dyn ApiTransport>,
	) -> Self {
		let gate =
			Arc::new(RateGate::new(config.rate_limit_max_requests, config.rate_limit_per));
		let tokens = Arc::new(TokenStore::new(
			credentials,
			config.token_url.clone(),
			config.redirect_uri.clone(),
			transport.clone(),
			gate.clone(),
		));
		let dispatcher = RetryDispatcher::new(&config, tokens.clone(), gate, transport);

		Self { config, tokens, dispatcher }
	}

	/// Static configuration supplied at construction.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Token store owning the cached client-credentials token.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Sends one logical request through the gate with retries.
	///
	/// Resolves with `Ok(Some(response))` on success, `Ok(None)` when a
	/// terminal failure is swallowed (`raise_on_error = false`), or the
	/// normalized error when raising.
	pub async fn send(&self, intent: &RequestIntent) -> Result<Option<ApiResponse>> {
		let mut state = AttemptState::new(self.config.max_retry);

		self.send_with_state(intent, &mut state).await
	}

	/// Sends one logical request, threading a caller-supplied attempt state.
	pub async fn send_with_state(
		&self,
		intent: &RequestIntent,
		state: &mut AttemptState,
	) -> Result<Option<ApiResponse>> {
		self.dispatcher.send(intent, state).await
	}

	/// Fetches every page of a collection and returns the items in page order.
	///
	/// See [`Pagination`] for the page size and cap options; `Ok(None)` only
	/// occurs in swallow mode when page 1 itself failed terminally.
	pub async fn fetch_all(
		&self,
		intent: &RequestIntent,
		options: &Pagination,
	) -> Result<Option<Vec<Value>>> {
		pages::fetch_all(&self.dispatcher, intent, options).await
	}

	/// Builds the authorization-endpoint URL for the browser redirect flow.
	///
	/// Requires a redirect URI, either configured or supplied in `options`.
	/// The `state` parameter defaults to 32 random bytes, base64url-encoded.
	pub fn authorize_url(&self, options: AuthorizeOptions) -> Result<Url> {
		let credentials = self.tokens.credentials();
		let redirect_uri = options
			.redirect_uri
			.as_ref()
			.or(self.config.redirect_uri.as_ref())
			.ok_or(ConfigError::MissingRedirectUri)?;
		let scopes = options.scopes.as_deref().unwrap_or(&credentials.scopes);
		let state = options.state.clone().unwrap_or_else(oauth::random_state);

		Ok(oauth::build_authorize_url(
			&self.config.oauth_url,
			&credentials.client_id,
			redirect_uri,
			scopes,
			&state,
		))
	}

	/// Exchanges an authorization code for a token payload.
	///
	/// The payload is returned without caching; see
	/// [`TokenStore::exchange_authorization_code`].
	pub async fn exchange_authorization_code(
		&self,
		code: &str,
		redirect_uri: Option<&Url>,
	) -> Result<TokenPayload> {
		self.tokens.exchange_authorization_code(code, redirect_uri).await
	}

	/// Queries the token introspection endpoint with the given token (or the
	/// cached one when `None`).
	pub async fn token_info(&self, token: Option<&str>) -> Result<Option<Value>> {
		let url =
			self.config.token_info_url.as_ref().ok_or(ConfigError::MissingTokenInfoUrl)?;
		let mut intent = RequestIntent::get(url.as_str());

		if let Some(token) = token {
			intent = intent.with_token(token);
		}

		match self.send(&intent).await? {
			Some(response) => Ok(Some(
				serde_json::from_slice(&response.body)
					.map_err(|source| Error::BodyParse { source })?,
			)),
			None => Ok(None),
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient {
	/// Creates a client with the crate's default reqwest transport.
	pub fn new(config: ClientConfig, credentials: Credentials) -> Self {
		Self::with_transport(config, credentials, Arc::new(ReqwestTransport::default()))
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("tokens", &self.tokens)
			.finish()
	}
}
