//! Fixed-window admission control shared by every outbound request.

// std
use std::time::Duration;
// crates.io
use tokio::time::Instant;
// self
use crate::_prelude::*;

/// Admission gate limiting outbound requests to a fixed count per time window.
///
/// Every request issued by one client instance passes through the same gate:
/// token grants, single calls, each fanned-out page fetch, and each retry
/// attempt. Waiters queue on the internal lock in arrival order and are
/// released as the window permits; the gate never drops or reorders an
/// admitted request.
pub struct RateGate {
	max_requests: u32,
	per: Duration,
	window: AsyncMutex<Window>,
}

#[derive(Clone, Copy, Debug)]
struct Window {
	opened_at: Instant,
	admitted: u32,
}

impl RateGate {
	/// Creates a gate admitting at most `max_requests` per `per` window.
	///
	/// A zero budget is clamped to one so the gate can never deadlock.
	pub fn new(max_requests: u32, per: Duration) -> Self {
		Self {
			max_requests: max_requests.max(1),
			per,
			window: AsyncMutex::new(Window { opened_at: Instant::now(), admitted: 0 }),
		}
	}

	/// Suspends until the current window permits one more request.
	pub async fn admit(&self) {
		let mut window = self.window.lock().await;
		let now = Instant::now();

		if now.duration_since(window.opened_at) >= self.per {
			window.opened_at = now;
			window.admitted = 0;
		}
		if window.admitted < self.max_requests {
			window.admitted += 1;

			return;
		}

		// The lock is held across the sleep so queued callers stay in arrival order.
		let reopens_at = window.opened_at + self.per;

		tokio::time::sleep_until(reopens_at).await;

		window.opened_at = Instant::now();
		window.admitted = 1;
	}
}
impl Debug for RateGate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateGate")
			.field("max_requests", &self.max_requests)
			.field("per", &self.per)
			.finish()
	}
}
