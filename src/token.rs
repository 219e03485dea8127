//! Token lifecycle management: cached client-credentials tokens and one-shot
//! authorization-code exchanges.
//!
//! The store keeps at most one live access token per client instance. The
//! token is acquired lazily on the first request that needs one, reused until
//! [`TokenStore::invalidate`] clears it (the dispatcher does so on a 401), and
//! reacquired on the next request. Acquisition is single-flight: concurrent
//! cache misses coalesce on an async guard so the token endpoint sees exactly
//! one grant submission instead of a stampede. Expiry is not tracked;
//! invalidation is purely reactive.

// self
use crate::{
	_prelude::*,
	config::Credentials,
	error::StatusError,
	gate::RateGate,
	http::{ApiRequest, ApiResponse, ApiTransport, Method},
};

/// Token endpoint response payload.
///
/// Only `access_token` is required; the remaining fields are kept as the
/// endpoint reports them and are not interpreted by the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPayload {
	/// Issued access token.
	pub access_token: String,
	/// Token type as reported, usually `bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Lifetime hint in seconds, unused by the store.
	#[serde(default)]
	pub expires_in: Option<u64>,
	/// Granted scope string, when the endpoint reports one.
	#[serde(default)]
	pub scope: Option<String>,
}

/// Owns the cached client-credentials access token for one client instance.
pub struct TokenStore {
	credentials: Credentials,
	token_url: Url,
	redirect_uri: Option<Url>,
	transport: Arc<dyn ApiTransport>,
	gate: Arc<RateGate>,
	cached: Mutex<Option<String>>,
	refresh_guard: AsyncMutex<()>,
}
impl TokenStore {
	/// Creates a store for the given credentials and token endpoint.
	pub fn new(
		credentials: Credentials,
		token_url: Url,
		redirect_uri: Option<Url>,
		transport: Arc<dyn ApiTransport>,
		gate: Arc<RateGate>,
	) -> Self {
		Self {
			credentials,
			token_url,
			redirect_uri,
			transport,
			gate,
			cached: Mutex::new(None),
			refresh_guard: AsyncMutex::new(()),
		}
	}

	/// Credentials supplied at construction.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Resolves the access token for one request.
	///
	/// An explicit override is returned verbatim without touching the cache.
	/// Otherwise the cached token is reused, acquiring one first through a
	/// client-credentials grant if the cache is empty.
	pub async fn get(&self, override_token: Option<&str>) -> Result<String> {
		if let Some(token) = override_token {
			return Ok(token.to_owned());
		}
		if let Some(token) = self.cached.lock().clone() {
			return Ok(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		// Another caller may have finished acquiring while we waited.
		if let Some(token) = self.cached.lock().clone() {
			return Ok(token);
		}

		let mut form = vec![
			("grant_type".to_owned(), "client_credentials".to_owned()),
			("client_id".to_owned(), self.credentials.client_id.clone()),
			("client_secret".to_owned(), self.credentials.client_secret.clone()),
		];

		if let Some(scope) = self.credentials.scope_value() {
			form.push(("scope".to_owned(), scope));
		}

		let payload = self.request_token(form).await?;

		*self.cached.lock() = Some(payload.access_token.clone());

		Ok(payload.access_token)
	}

	/// Clears the cached token unconditionally.
	///
	/// The next [`get`](Self::get) without an override reacquires one.
	pub fn invalidate(&self) {
		*self.cached.lock() = None;
	}

	/// Performs a one-shot authorization-code grant exchange.
	///
	/// The resulting payload is returned without caching; authorization-code
	/// tokens are caller-managed and never reused by the store.
	pub async fn exchange_authorization_code(
		&self,
		code: &str,
		redirect_uri: Option<&Url>,
	) -> Result<TokenPayload> {
		let mut form = vec![
			("grant_type".to_owned(), "authorization_code".to_owned()),
			("client_id".to_owned(), self.credentials.client_id.clone()),
			("client_secret".to_owned(), self.credentials.client_secret.clone()),
			("code".to_owned(), code.to_owned()),
		];

		if let Some(redirect) = redirect_uri.or(self.redirect_uri.as_ref()) {
			form.push(("redirect_uri".to_owned(), redirect.to_string()));
		}

		self.request_token(form).await
	}

	async fn request_token(&self, form: Vec<(String, String)>) -> Result<TokenPayload> {
		self.gate.admit().await;

		let request = ApiRequest::form_post(self.token_url.clone(), form);
		let response = self.transport.execute(request).await.map_err(Error::from)?;

		if !response.is_success() {
			return Err(StatusError::from_response(
				Method::Post,
				self.token_url.path(),
				&response,
			)
			.into());
		}

		parse_token_payload(&response)
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("credentials", &self.credentials)
			.field("token_url", &self.token_url.as_str())
			.field("cached", &self.cached.lock().is_some())
			.finish()
	}
}

fn parse_token_payload(response: &ApiResponse) -> Result<TokenPayload> {
	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::TokenResponseParse { source, status: Some(response.status) })
}
