// std
use std::{collections::HashMap, sync::Arc, time::Duration};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use restgate::{
	client::ApiClient,
	config::{ClientConfig, Credentials},
	error::{ConfigError, Error},
	http::ReqwestTransport,
	oauth::AuthorizeOptions,
	url::Url,
};

fn url(value: &str) -> Url {
	Url::parse(value).expect("URL fixture should parse successfully.")
}

fn build_client(redirect: Option<Url>) -> ApiClient {
	let mut config = ClientConfig::new(
		url("https://api.example.com/v1"),
		url("https://auth.example.com/token"),
		url("https://auth.example.com/authorize"),
	)
	.with_rate_limit(64, Duration::from_millis(10));

	if let Some(redirect) = redirect {
		config = config.with_redirect_uri(redirect);
	}

	ApiClient::with_transport(
		config,
		Credentials::new("client-1", "secret-1").with_scopes(["api.read", "api.write"]),
		Arc::new(ReqwestTransport::default()),
	)
}

fn query_map(url: &Url) -> HashMap<String, String> {
	url.query_pairs().map(|(key, value)| (key.into_owned(), value.into_owned())).collect()
}

#[test]
fn authorize_url_carries_the_exact_expected_parameters() {
	let client = build_client(Some(url("https://app.example.com/cb")));
	let authorize = client
		.authorize_url(AuthorizeOptions::new().with_state("abc"))
		.expect("Authorize URL should build with a configured redirect URI.");
	let pairs = query_map(&authorize);

	assert!(authorize.as_str().starts_with("https://auth.example.com/authorize?"));
	assert_eq!(pairs.get("client_id"), Some(&"client-1".to_owned()));
	assert_eq!(pairs.get("redirect_uri"), Some(&"https://app.example.com/cb".to_owned()));
	assert_eq!(pairs.get("response_type"), Some(&"code".to_owned()));
	assert_eq!(pairs.get("scope"), Some(&"api.read api.write".to_owned()));
	assert_eq!(pairs.get("state"), Some(&"abc".to_owned()));
}

#[test]
fn generated_state_is_32_random_bytes_base64url() {
	let client = build_client(Some(url("https://app.example.com/cb")));
	let first = client
		.authorize_url(AuthorizeOptions::new())
		.expect("Authorize URL should build without an explicit state.");
	let second = client
		.authorize_url(AuthorizeOptions::new())
		.expect("Authorize URL should build without an explicit state.");
	let state_of = |authorize: &Url| {
		query_map(authorize).get("state").cloned().expect("Authorize URL should carry a state.")
	};
	let decoded = URL_SAFE_NO_PAD
		.decode(state_of(&first))
		.expect("Generated state should be valid base64url.");

	assert_eq!(decoded.len(), 32);
	assert_ne!(state_of(&first), state_of(&second));
}

#[test]
fn options_override_redirect_and_scopes() {
	let client = build_client(Some(url("https://app.example.com/cb")));
	let authorize = client
		.authorize_url(
			AuthorizeOptions::new()
				.with_redirect_uri(url("https://other.example.com/return"))
				.with_scopes(["admin"])
				.with_state("s"),
		)
		.expect("Authorize URL should honor per-call overrides.");
	let pairs = query_map(&authorize);

	assert_eq!(pairs.get("redirect_uri"), Some(&"https://other.example.com/return".to_owned()));
	assert_eq!(pairs.get("scope"), Some(&"admin".to_owned()));
}

#[test]
fn missing_redirect_uri_is_a_config_error() {
	let client = build_client(None);
	let err = client
		.authorize_url(AuthorizeOptions::new())
		.expect_err("Authorize URL without any redirect URI should fail.");

	assert!(matches!(err, Error::Config(ConfigError::MissingRedirectUri)));
}
