//! The retry dispatcher: one logical request, driven through the token store,
//! the rate gate, and the transport, with a bounded iterative retry loop.
//!
//! Retries apply to the fixed status set {401, 429, 500} for every HTTP
//! method, non-idempotent ones included. A 500 on a POST/PATCH/DELETE may
//! reflect a side effect the server already applied; callers that cannot
//! tolerate duplicates must pass an idempotency mechanism of their own.

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::{ConfigError, StatusError},
	gate::RateGate,
	http::{ApiRequest, ApiResponse, ApiTransport, Method},
	obs::{self, RequestSpan},
	token::TokenStore,
};

/// Statuses the dispatcher retries while attempts remain. Not configurable.
const RETRYABLE_STATUSES: [u16; 3] = [401, 429, 500];

/// Caller-supplied description of one logical API call.
#[derive(Clone, Debug)]
pub struct RequestIntent {
	/// HTTP method.
	pub method: Method,
	/// Path joined onto the configured base URL, or a full URL. May carry its
	/// own query string; embedded pairs merge with `query`, explicit wins.
	pub path: String,
	/// Explicit query parameters, in insertion order.
	pub query: Vec<(String, String)>,
	/// JSON request body, when present.
	pub body: Option<serde_json::Value>,
	/// Explicit token overriding the cached client-credentials token.
	pub token: Option<String>,
	/// Per-call override of the `log_line` configuration flag.
	pub log_line: Option<bool>,
	/// Per-call override of the `err_log_body` configuration flag.
	pub err_log_body: Option<bool>,
}
impl RequestIntent {
	/// Creates an intent for the given method and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			body: None,
			token: None,
			log_line: None,
			err_log_body: None,
		}
	}

	/// GET intent shorthand.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// POST intent shorthand.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// PUT intent shorthand.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// PATCH intent shorthand.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// DELETE intent shorthand.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Appends one explicit query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets the JSON request body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Sets an explicit token, bypassing the cached one for this call.
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());

		self
	}

	/// Overrides the `log_line` flag for this call.
	pub fn with_log_line(mut self, enabled: bool) -> Self {
		self.log_line = Some(enabled);

		self
	}

	/// Overrides the `err_log_body` flag for this call.
	pub fn with_err_log_body(mut self, enabled: bool) -> Self {
		self.err_log_body = Some(enabled);

		self
	}
}

/// Mutable per-logical-request state threaded through the retry loop and,
/// for pagination, through each page fetch.
#[derive(Clone, Copy, Debug)]
pub struct AttemptState {
	/// Attempts consumed so far; never exceeds `max_retry`.
	pub attempt: u32,
	/// Retry budget after the initial attempt.
	pub max_retry: u32,
	/// Page this state belongs to, for paginated fetches.
	pub current_page: Option<u32>,
	/// Total page count once discovered, for paginated fetches.
	pub total_pages: Option<u32>,
}
impl AttemptState {
	/// Creates a fresh state with the given retry budget.
	pub fn new(max_retry: u32) -> Self {
		Self { attempt: 0, max_retry, current_page: None, total_pages: None }
	}

	/// Creates a fresh state for one fanned-out page fetch.
	pub(crate) fn for_page(max_retry: u32, page: u32, total_pages: u32) -> Self {
		Self { attempt: 0, max_retry, current_page: Some(page), total_pages: Some(total_pages) }
	}
}

/// Executes logical requests with credential attachment, rate admission, and
/// bounded retries.
pub struct RetryDispatcher {
	base_url: Url,
	max_retry: u32,
	log_line: bool,
	err_log_body: bool,
	raise_on_error: bool,
	tokens: Arc<TokenStore>,
	gate: Arc<RateGate>,
	transport: Arc<dyn ApiTransport>,
}
impl RetryDispatcher {
	pub(crate) fn new(
		config: &ClientConfig,
		tokens: Arc<TokenStore>,
		gate: Arc<RateGate>,
		transport: Arc<dyn ApiTransport>,
	) -> Self {
		Self {
			base_url: config.base_url.clone(),
			max_retry: config.max_retry,
			log_line: config.log_line,
			err_log_body: config.err_log_body,
			raise_on_error: config.raise_on_error,
			tokens,
			gate,
			transport,
		}
	}

	pub(crate) fn max_retry(&self) -> u32 {
		self.max_retry
	}

	/// Sends one logical request, retrying per the fixed policy.
	///
	/// Resolves with `Ok(Some(response))` on success, `Ok(None)` when a
	/// terminal failure is swallowed (`raise_on_error = false`), or the
	/// normalized [`StatusError`] when raising. Exactly `max_retry + 1`
	/// attempts are made for a persistently retryable status.
	pub async fn send(
		&self,
		intent: &RequestIntent,
		state: &mut AttemptState,
	) -> Result<Option<ApiResponse>> {
		let (url, query) = resolve_target(&self.base_url, intent)?;
		let route = url.path().to_owned();
		let span = RequestSpan::new(intent.method, &route);

		span.instrument(self.drive(intent, state, url, query, route)).await
	}

	async fn drive(
		&self,
		intent: &RequestIntent,
		state: &mut AttemptState,
		url: Url,
		query: Vec<(String, String)>,
		route: String,
	) -> Result<Option<ApiResponse>> {
		loop {
			let token = match self.tokens.get(intent.token.as_deref()).await {
				Ok(token) => token,
				Err(Error::Status(failure)) => {
					if state.attempt < state.max_retry && is_retryable(failure.status) {
						if failure.status == Some(429)
							&& let Some(wait) = failure.retry_after
						{
							tokio::time::sleep(wait).await;
						}

						state.attempt += 1;

						continue;
					}

					return self.terminate(intent, failure);
				},
				Err(Error::Transport(failure)) => {
					return self.terminate(
						intent,
						StatusError::no_response(intent.method, &route, &failure),
					);
				},
				// Parse and configuration failures are programming errors, never retried.
				Err(other) => return Err(other),
			};

			self.gate.admit().await;

			let request = ApiRequest {
				method: intent.method,
				url: url.clone(),
				bearer: Some(token),
				query: query.clone(),
				form: None,
				body: intent.body.clone(),
			};

			match self.transport.execute(request).await {
				Ok(response) if response.is_success() => {
					obs::log_success(
						intent.log_line.unwrap_or(self.log_line),
						intent.method,
						&route,
						response.status,
					);

					return Ok(Some(response));
				},
				Ok(response) => {
					if state.attempt < state.max_retry && is_retryable(Some(response.status)) {
						if response.status == 401 {
							// Force reacquisition on the next attempt.
							self.tokens.invalidate();
						}
						if response.status == 429 {
							if let Some(wait) = response.retry_after() {
								tokio::time::sleep(wait).await;
							}
						}

						state.attempt += 1;

						continue;
					}

					let failure = StatusError::from_response(intent.method, &route, &response);

					return self.terminate(intent, failure);
				},
				Err(failure) =>
					return self.terminate(
						intent,
						StatusError::no_response(intent.method, &route, &failure),
					),
			}
		}
	}

	fn terminate(
		&self,
		intent: &RequestIntent,
		failure: StatusError,
	) -> Result<Option<ApiResponse>> {
		obs::log_failure(
			intent.log_line.unwrap_or(self.log_line),
			intent.err_log_body.unwrap_or(self.err_log_body),
			&failure,
		);

		if self.raise_on_error { Err(failure.into()) } else { Ok(None) }
	}
}
impl Debug for RetryDispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryDispatcher")
			.field("base_url", &self.base_url.as_str())
			.field("max_retry", &self.max_retry)
			.field("raise_on_error", &self.raise_on_error)
			.finish()
	}
}

fn is_retryable(status: Option<u16>) -> bool {
	status.is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
}

/// Resolves the intent's target against the base URL and merges query pairs.
///
/// Query parameters embedded in the path are stripped from the URL and merged
/// with the explicit parameters; explicit wins on key collision. The transport
/// receives a clean URL plus the combined parameter list.
pub(crate) fn resolve_target(
	base_url: &Url,
	intent: &RequestIntent,
) -> Result<(Url, Vec<(String, String)>)> {
	// A path is only absolute when a scheme precedes the first `/` or `?`; a
	// `://` inside a query value does not make it one.
	let absolute = intent
		.path
		.split_once("://")
		.is_some_and(|(scheme, _)| !scheme.is_empty() && !scheme.contains(['/', '?']));
	let raw = if absolute {
		intent.path.clone()
	} else {
		let path = intent.path.trim_start_matches('/');

		format!("{}/{path}", base_url.as_str().trim_end_matches('/'))
	};
	let mut url =
		Url::parse(&raw).map_err(|source| ConfigError::InvalidRequestPath { source })?;
	let mut merged: Vec<(String, String)> =
		url.query_pairs().map(|(key, value)| (key.into_owned(), value.into_owned())).collect();

	url.set_query(None);

	for (key, value) in &intent.query {
		if let Some(existing) = merged.iter_mut().find(|(existing, _)| existing == key) {
			existing.1 = value.clone();
		} else {
			merged.push((key.clone(), value.clone()));
		}
	}

	Ok((url, merged))
}
