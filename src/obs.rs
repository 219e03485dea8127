//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named
//!   `restgate.request` and the per-outcome log lines controlled by the
//!   `log_line` / `err_log_body` configuration flags. Without the feature
//!   every helper compiles to a no-op.

// self
use crate::{_prelude::*, error::StatusError, http::Method};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder covering one logical request, retries included.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the request method + route.
	pub fn new(method: Method, route: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("restgate.request", method = method.as_str(), route);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, route);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the success log line when `log_line` is enabled for the call.
pub(crate) fn log_success(enabled: bool, method: Method, route: &str, status: u16) {
	if !enabled {
		return;
	}

	#[cfg(feature = "tracing")]
	tracing::info!(method = method.as_str(), route, status, "Request succeeded.");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, route, status);
}

/// Emits the failure log line, attaching the body when `err_log_body` is enabled.
pub(crate) fn log_failure(enabled: bool, include_body: bool, error: &StatusError) {
	if !enabled {
		return;
	}

	#[cfg(feature = "tracing")]
	if include_body {
		tracing::error!(body = error.body.as_str(), "{error}");
	} else {
		tracing::error!("{error}");
	}
	#[cfg(not(feature = "tracing"))]
	let _ = (include_body, error);
}

/// Warns about a fanned-out page dropped from a swallow-mode merge.
pub(crate) fn log_dropped_page(page: u32) {
	#[cfg(feature = "tracing")]
	tracing::warn!(page, "Paginated fetch dropped a page whose retries were exhausted.");
	#[cfg(not(feature = "tracing"))]
	let _ = page;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_span_builds_without_tracing() {
		let _span = RequestSpan::new(Method::Get, "/widgets");
		// Compile-time smoke test ensures the span exists even when tracing is disabled.
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = RequestSpan::new(Method::Post, "/widgets");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
