//! Authenticated REST client for a single remote API: OAuth2 token management,
//! rate-gated dispatch, transparent retries, and Link-header pagination in one
//! crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod pages;
pub mod token;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::time::Duration;
	// self
	use crate::{
		client::ApiClient,
		config::{ClientConfig, Credentials},
		http::ReqwestTransport,
	};

	/// Builds a reqwest transport that accepts the self-signed certificates
	/// produced by `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Configuration pointing every endpoint at a mock server base URL, with a
	/// rate window generous enough to keep tests fast.
	pub fn test_config(server_base: &str) -> ClientConfig {
		let url = |path: &str| {
			Url::parse(&format!("{server_base}{path}"))
				.expect("Mock endpoint URL should parse successfully.")
		};

		ClientConfig::new(url("/api"), url("/token"), url("/authorize"))
			.with_token_info_url(url("/token/info"))
			.with_rate_limit(64, Duration::from_millis(10))
	}

	/// Constructs an [`ApiClient`] from a prepared configuration and the
	/// reqwest transport used across integration tests.
	pub fn build_test_client_with(config: ClientConfig) -> ApiClient {
		ApiClient::with_transport(
			config,
			Credentials::new("test-client", "test-secret").with_scopes(["api.read"]),
			Arc::new(test_reqwest_transport()),
		)
	}

	/// Constructs an [`ApiClient`] against a mock server base URL with default
	/// test configuration.
	pub fn build_test_client(server_base: &str) -> ApiClient {
		build_test_client_with(test_config(server_base))
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use httpmock as _;
#[cfg(test)] use restgate as _;
