//! Client-wide error types shared across the token store, dispatcher, and pagination.

// std
use std::time::Duration;
// self
use crate::{
	_prelude::*,
	http::{ApiResponse, Method},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) with no HTTP response.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Terminal HTTP failure after retries were exhausted or skipped.
	#[error(transparent)]
	Status(#[from] StatusError),

	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the token response.
		status: Option<u16>,
	},
	/// Response body was expected to be JSON but could not be parsed.
	#[error("Response body is not valid JSON.")]
	BodyParse {
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
}
impl Error {
	/// Returns the HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Error::Status(inner) => inner.status,
			Error::TokenResponseParse { status, .. } => *status,
			_ => None,
		}
	}
}

/// Configuration and validation failures raised before any request is issued.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path cannot be joined onto the configured base URL.
	#[error("Request path cannot be resolved against the base URL.")]
	InvalidRequestPath {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Authorization URL requested without a redirect URI configured.
	#[error("No redirect URI is configured for the authorization URL.")]
	MissingRedirectUri,
	/// Token info requested without a token info endpoint configured.
	#[error("No token info endpoint is configured.")]
	MissingTokenInfoUrl,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO); no HTTP response was received.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Normalized terminal failure for one logical request.
///
/// Exactly one value is produced per unrecovered request; intermediate retried
/// attempts never surface. An absent `status` means no HTTP response was
/// received and renders as `NaN` with status text `Unknown`.
#[derive(Debug, ThisError)]
#[error("{method} {route} - HTTP {status} {status_text}", status = Self::status_label(.status))]
pub struct StatusError {
	/// HTTP method of the failed request.
	pub method: Method,
	/// Resolved route (path) of the failed request.
	pub route: String,
	/// HTTP status code, absent when no response was received.
	pub status: Option<u16>,
	/// HTTP status text, `Unknown` when no response was received.
	pub status_text: String,
	/// Raw response body, or the transport failure's message.
	pub body: String,
	/// Parsed `Retry-After` hint carried by the response, when present.
	pub retry_after: Option<Duration>,
}
impl StatusError {
	/// Normalizes a non-2xx response into a terminal failure.
	pub fn from_response(method: Method, route: impl Into<String>, response: &ApiResponse) -> Self {
		Self {
			method,
			route: route.into(),
			status: Some(response.status),
			status_text: response.status_text.clone(),
			body: response.text(),
			retry_after: response.retry_after(),
		}
	}

	/// Normalizes a transport failure that produced no response at all.
	///
	/// The status renders as `NaN` and the body carries the transport
	/// failure's message.
	pub fn no_response(method: Method, route: impl Into<String>, failure: &TransportError) -> Self {
		Self {
			method,
			route: route.into(),
			status: None,
			status_text: "Unknown".into(),
			body: failure.to_string(),
			retry_after: None,
		}
	}

	fn status_label(status: &Option<u16>) -> String {
		status.map_or_else(|| "NaN".into(), |code| code.to_string())
	}
}
