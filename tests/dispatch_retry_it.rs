// std
use std::{
	collections::VecDeque,
	sync::{Arc, Mutex},
	time::Duration,
};
// self
use restgate::{
	client::ApiClient,
	config::{ClientConfig, Credentials},
	dispatch::{AttemptState, RequestIntent},
	error::{Error, TransportError},
	http::{ApiRequest, ApiResponse, ApiTransport, Method, TransportFuture},
	url::Url,
};

/// Transport stub that replays a scripted response sequence and records every
/// request it receives, in order.
struct ScriptedTransport {
	responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
	requests: Mutex<Vec<ApiRequest>>,
}
impl ScriptedTransport {
	fn new(responses: impl IntoIterator<Item = Result<ApiResponse, TransportError>>) -> Arc<Self> {
		Arc::new(Self {
			responses: Mutex::new(responses.into_iter().collect()),
			requests: Mutex::new(Vec::new()),
		})
	}

	fn requests(&self) -> Vec<ApiRequest> {
		self.requests.lock().expect("Request log lock should not be poisoned.").clone()
	}
}
impl ApiTransport for ScriptedTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		self.requests.lock().expect("Request log lock should not be poisoned.").push(request);

		let next = self
			.responses
			.lock()
			.expect("Response script lock should not be poisoned.")
			.pop_front()
			.expect("Scripted transport ran out of responses.");

		Box::pin(async move { next })
	}
}

fn token_grant(token: &str) -> Result<ApiResponse, TransportError> {
	Ok(ApiResponse {
		status: 200,
		status_text: "OK".into(),
		headers: vec![("content-type".into(), "application/json".into())],
		body: format!("{{\"access_token\":\"{token}\",\"token_type\":\"bearer\"}}").into_bytes(),
	})
}

fn status(code: u16, text: &str, body: &str) -> Result<ApiResponse, TransportError> {
	Ok(ApiResponse {
		status: code,
		status_text: text.into(),
		headers: Vec::new(),
		body: body.as_bytes().to_vec(),
	})
}

fn config() -> ClientConfig {
	let url = |value: &str| Url::parse(value).expect("Endpoint fixture URL should parse.");

	ClientConfig::new(
		url("https://api.example.com/v1"),
		url("https://auth.example.com/token"),
		url("https://auth.example.com/authorize"),
	)
	.with_rate_limit(64, Duration::from_millis(10))
}

fn build_client(config: ClientConfig, transport: &Arc<ScriptedTransport>) -> ApiClient {
	ApiClient::with_transport(
		config,
		Credentials::new("client-id", "client-secret").with_scopes(["api.read"]),
		transport.clone(),
	)
}

#[tokio::test]
async fn recovers_within_the_retry_budget() {
	// maxRetry = 2; the server answers 500, 500, 200 for the same logical call.
	let transport = ScriptedTransport::new([
		token_grant("tok-1"),
		status(500, "Internal Server Error", "boom"),
		status(500, "Internal Server Error", "boom"),
		status(200, "OK", "{\"id\":7}"),
	]);
	let client = build_client(config().with_max_retry(2), &transport);
	let response = client
		.send(&RequestIntent::get("/widgets/7"))
		.await
		.expect("Recovered request should succeed.")
		.expect("Recovered request should carry a response.");

	assert_eq!(response.status, 200);
	assert_eq!(response.text(), "{\"id\":7}");
	// One token grant plus three resource attempts.
	assert_eq!(transport.requests().len(), 4);
}

#[tokio::test]
async fn makes_exactly_max_retry_plus_one_attempts() {
	let transport = ScriptedTransport::new([
		token_grant("tok-1"),
		status(500, "Internal Server Error", ""),
		status(500, "Internal Server Error", ""),
		status(500, "Internal Server Error", ""),
	]);
	let client = build_client(config().with_max_retry(2), &transport);
	let mut state = AttemptState::new(2);
	let err = client
		.send_with_state(&RequestIntent::get("/widgets"), &mut state)
		.await
		.expect_err("Exhausted retries should raise the normalized error.");

	let Error::Status(failure) = err else { panic!("Expected a status error, got: {err:?}") };

	assert_eq!(failure.status, Some(500));
	assert_eq!(failure.method, Method::Get);
	assert_eq!(failure.route, "/v1/widgets");
	assert_eq!(failure.to_string(), "GET /v1/widgets - HTTP 500 Internal Server Error");
	assert_eq!(state.attempt, 2);

	let resource_calls =
		transport.requests().iter().filter(|request| request.url.path() == "/v1/widgets").count();

	assert_eq!(resource_calls, 3);
}

#[tokio::test]
async fn never_retries_a_non_retryable_status() {
	let transport =
		ScriptedTransport::new([token_grant("tok-1"), status(404, "Not Found", "missing")]);
	let client = build_client(config().with_max_retry(5), &transport);
	let err = client
		.send(&RequestIntent::get("/widgets/404"))
		.await
		.expect_err("A 404 should surface without retries.");

	let Error::Status(failure) = err else { panic!("Expected a status error, got: {err:?}") };

	assert_eq!(failure.status, Some(404));
	assert_eq!(failure.body, "missing");
	// One token grant, one resource attempt, nothing else.
	assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn a_401_invalidates_the_token_before_the_next_attempt() {
	let transport = ScriptedTransport::new([
		token_grant("tok-stale"),
		status(401, "Unauthorized", ""),
		token_grant("tok-fresh"),
		status(200, "OK", "{}"),
	]);
	let client = build_client(config().with_max_retry(1), &transport);
	let response = client
		.send(&RequestIntent::get("/widgets"))
		.await
		.expect("Retried request should succeed after reauthentication.")
		.expect("Retried request should carry a response.");

	assert_eq!(response.status, 200);

	let requests = transport.requests();

	assert_eq!(requests.len(), 4);
	assert_eq!(requests[1].bearer.as_deref(), Some("tok-stale"));
	assert_eq!(requests[3].bearer.as_deref(), Some("tok-fresh"));
}

#[tokio::test(start_paused = true)]
async fn a_429_waits_for_the_retry_after_hint() {
	let transport = ScriptedTransport::new([
		token_grant("tok-1"),
		Ok(ApiResponse {
			status: 429,
			status_text: "Too Many Requests".into(),
			headers: vec![("retry-after".into(), "2".into())],
			body: Vec::new(),
		}),
		status(200, "OK", "{}"),
	]);
	let client = build_client(config().with_max_retry(1), &transport);
	let before = tokio::time::Instant::now();
	let response = client
		.send(&RequestIntent::get("/widgets"))
		.await
		.expect("Retried request should succeed after the hint elapses.")
		.expect("Retried request should carry a response.");

	assert_eq!(response.status, 200);
	assert!(before.elapsed() >= Duration::from_secs(2));
	assert_eq!(transport.requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn a_token_endpoint_429_waits_for_the_retry_after_hint() {
	let transport = ScriptedTransport::new([
		Ok(ApiResponse {
			status: 429,
			status_text: "Too Many Requests".into(),
			headers: vec![("retry-after".into(), "3".into())],
			body: Vec::new(),
		}),
		token_grant("tok-1"),
		status(200, "OK", "{}"),
	]);
	let client = build_client(config().with_max_retry(1), &transport);
	let before = tokio::time::Instant::now();
	let response = client
		.send(&RequestIntent::get("/widgets"))
		.await
		.expect("Request should succeed once the token endpoint recovers.")
		.expect("Request should carry a response.");

	assert_eq!(response.status, 200);
	assert!(before.elapsed() >= Duration::from_secs(3));
	// One rejected grant, one successful grant, one resource call.
	assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn swallow_mode_resolves_to_none_after_exhaustion() {
	let responses = std::iter::once(token_grant("tok-1"))
		.chain((0..6).map(|_| status(500, "Internal Server Error", "")));
	let transport = ScriptedTransport::new(responses);
	// Default retry budget of 5, swallowing instead of raising.
	let client = build_client(config().with_raise_on_error(false), &transport);
	let outcome = client
		.send(&RequestIntent::post("/widgets"))
		.await
		.expect("Swallow mode should never raise.");

	assert!(outcome.is_none());
	// One token grant plus six attempts (1 initial + 5 retries).
	assert_eq!(transport.requests().len(), 7);
}

#[tokio::test]
async fn transport_failures_terminate_without_retry() {
	let transport = ScriptedTransport::new([
		token_grant("tok-1"),
		Err(TransportError::Io(std::io::Error::other("connection reset"))),
	]);
	let client = build_client(config().with_max_retry(5), &transport);
	let err = client
		.send(&RequestIntent::get("/widgets"))
		.await
		.expect_err("Transport failure should surface immediately.");

	let Error::Status(failure) = err else { panic!("Expected a status error, got: {err:?}") };

	assert_eq!(failure.status, None);
	assert_eq!(failure.to_string(), "GET /v1/widgets - HTTP NaN Unknown");
	assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn explicit_token_override_skips_acquisition() {
	let transport = ScriptedTransport::new([status(200, "OK", "{}")]);
	let client = build_client(config(), &transport);
	let response = client
		.send(&RequestIntent::get("/widgets").with_token("caller-token"))
		.await
		.expect("Override request should succeed.")
		.expect("Override request should carry a response.");

	assert_eq!(response.status, 200);

	let requests = transport.requests();

	// No token grant was issued at all.
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].bearer.as_deref(), Some("caller-token"));
}

#[tokio::test]
async fn token_endpoint_failures_carry_the_token_route() {
	let transport =
		ScriptedTransport::new([status(400, "Bad Request", "{\"error\":\"invalid_client\"}")]);
	let client = build_client(config(), &transport);
	let err = client
		.send(&RequestIntent::get("/widgets"))
		.await
		.expect_err("Token endpoint rejection should surface.");

	let Error::Status(failure) = err else { panic!("Expected a status error, got: {err:?}") };

	assert_eq!(failure.status, Some(400));
	assert_eq!(failure.route, "/token");
	assert_eq!(failure.method, Method::Post);
}

#[tokio::test]
async fn client_credentials_grant_posts_the_configured_credentials() {
	let transport = ScriptedTransport::new([token_grant("tok-1"), status(200, "OK", "{}")]);
	let client = build_client(config(), &transport);

	client
		.send(&RequestIntent::get("/widgets"))
		.await
		.expect("Request should succeed.")
		.expect("Request should carry a response.");

	let requests = transport.requests();
	let form = requests[0].form.clone().expect("Token grant should be form-encoded.");

	assert_eq!(requests[0].method, Method::Post);
	assert!(form.contains(&("grant_type".to_owned(), "client_credentials".to_owned())));
	assert!(form.contains(&("client_id".to_owned(), "client-id".to_owned())));
	assert!(form.contains(&("client_secret".to_owned(), "client-secret".to_owned())));
	assert!(form.contains(&("scope".to_owned(), "api.read".to_owned())));
}

#[tokio::test]
async fn authorization_code_exchange_posts_code_and_redirect() {
	let transport = ScriptedTransport::new([token_grant("code-token"), token_grant("cc-token")]);
	let redirect = Url::parse("https://app.example.com/cb")
		.expect("Redirect URL fixture should parse successfully.");
	let client = build_client(config().with_redirect_uri(redirect.clone()), &transport);
	let payload = client
		.exchange_authorization_code("auth-code-1", None)
		.await
		.expect("Authorization code exchange should succeed.");

	assert_eq!(payload.access_token, "code-token");

	let form = transport.requests()[0]
		.form
		.clone()
		.expect("Authorization code exchange should be form-encoded.");

	assert!(form.contains(&("grant_type".to_owned(), "authorization_code".to_owned())));
	assert!(form.contains(&("code".to_owned(), "auth-code-1".to_owned())));
	assert!(form.contains(&("redirect_uri".to_owned(), redirect.to_string())));

	// The exchanged token was not cached: the next request runs its own
	// client-credentials grant.
	let token = client.tokens().get(None).await.expect("Cached token fetch should succeed.");

	assert_eq!(token, "cc-token");
}
