//! Transport primitives for the authenticated API client.
//!
//! The module exposes [`ApiTransport`] alongside [`ApiRequest`] and [`ApiResponse`]
//! so downstream crates can integrate custom HTTP clients. The trait is the
//! client's only dependency on an HTTP stack: the dispatcher hands it a clean
//! URL, a merged query map, and an optional bearer token, and receives back the
//! status, status text, headers, and raw body (or a [`TransportError`] when no
//! response was produced at all).

// std
use std::ops::Deref;
// crates.io
use time::{Duration as TimeDuration, OffsetDateTime, format_description::well_known::Rfc2822};
// self
use crate::{_prelude::*, error::TransportError};

/// HTTP methods the client issues against the remote API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns the canonical uppercase method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One outbound HTTP request as seen by the transport.
///
/// The URL carries no query string of its own; the dispatcher merges URL-borne
/// and explicit query pairs before the transport is invoked.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Clean target URL (query already stripped and merged into `query`).
	pub url: Url,
	/// Bearer token attached as the `Authorization` header, when present.
	pub bearer: Option<String>,
	/// Combined query parameter list, in insertion order.
	pub query: Vec<(String, String)>,
	/// URL-encoded form body (token grants), mutually exclusive with `body`.
	pub form: Option<Vec<(String, String)>>,
	/// JSON body, when present.
	pub body: Option<serde_json::Value>,
}
impl ApiRequest {
	/// Creates a form-encoded POST, as used by token grant submissions.
	pub fn form_post(url: Url, form: Vec<(String, String)>) -> Self {
		Self { method: Method::Post, url, bearer: None, query: Vec::new(), form: Some(form), body: None }
	}
}

/// One HTTP response as returned by the transport, headers and raw body intact.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// HTTP status text (canonical reason phrase).
	pub status_text: String,
	/// Response headers as received, order preserved.
	pub headers: Vec<(String, String)>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Whether the status is in the 2xx range.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the first header with the given name, matched case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Parses the `Retry-After` header as either a second count or an RFC 2822 date.
	pub fn retry_after(&self) -> Option<std::time::Duration> {
		let raw = self.header("retry-after")?.trim();

		if let Ok(secs) = raw.parse::<u64>() {
			return Some(std::time::Duration::from_secs(secs));
		}
		if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
			let delta: TimeDuration = moment - OffsetDateTime::now_utc();

			if delta.is_positive() {
				return delta.try_into().ok();
			}
		}

		None
	}
}

/// Boxed future returned by [`ApiTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing API requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be
/// shared behind `Arc<dyn ApiTransport>` across every concurrent logical call
/// issued by a client instance. A non-2xx status is not a transport failure:
/// implementations return [`ApiResponse`] for any status they receive and
/// reserve [`TransportError`] for cases where no response exists (DNS, TCP,
/// TLS, IO).
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes one HTTP request and resolves with the raw response.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			if !request.query.is_empty() {
				builder = builder.query(&request.query);
			}
			if let Some(token) = &request.bearer {
				builder = builder.bearer_auth(token);
			}
			if let Some(form) = &request.form {
				builder = builder.form(form);
			}
			if let Some(body) = &request.body {
				builder = builder.json(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status();
			let headers = response
				.headers()
				.iter()
				.map(|(key, value)| {
					(key.as_str().to_owned(), String::from_utf8_lossy(value.as_bytes()).into_owned())
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(ApiResponse {
				status: status.as_u16(),
				status_text: status.canonical_reason().unwrap_or("Unknown").to_owned(),
				headers,
				body,
			})
		})
	}
}
