//! Per-authenticator token counters exposed for tests and diagnostics.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-authenticator token counters.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	fetches: AtomicU64,
	cache_hits: AtomicU64,
	failures: AtomicU64,
}
impl TokenMetrics {
	/// Token endpoint exchanges attempted.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Requests served from a cached token.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Token acquisitions that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
