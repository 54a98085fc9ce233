// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how loader calls were served.
#[derive(Debug, Default)]
pub struct FetchMetrics {
	calls: AtomicU64,
	network_requests: AtomicU64,
	cache_hits: AtomicU64,
	stale_fallbacks: AtomicU64,
	failures: AtomicU64,
}
impl FetchMetrics {
	/// Returns the number of `fetch_json`/`fetch_outcome` calls.
	pub fn calls(&self) -> u64 {
		self.calls.load(Ordering::Relaxed)
	}

	/// Returns the number of HTTP attempts issued, retries included.
	pub fn network_requests(&self) -> u64 {
		self.network_requests.load(Ordering::Relaxed)
	}

	/// Returns the number of calls served from a fresh cache entry.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of failed calls answered with a stale payload.
	pub fn stale_fallbacks(&self) -> u64 {
		self.stale_fallbacks.load(Ordering::Relaxed)
	}

	/// Returns the number of calls that produced no data.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_call(&self) {
		self.calls.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_network_request(&self) {
		self.network_requests.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_stale_fallback(&self) {
		self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
