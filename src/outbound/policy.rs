//! Token reuse policy for the service-credential authenticator.

// self
use crate::{_prelude::*, auth::TokenRecord, store::StoreKey};

/// Decides whether an issued token may serve more than one outbound call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenPolicy {
	/// Fetch a fresh token for every outbound call. No state is shared between calls.
	#[default]
	PerRequest,
	/// Reuse a stored token until it is revoked, expired, or inside the preemptive window
	/// before expiry. Concurrent callers share one in-flight fetch.
	Cached {
		/// Refresh this long before expiry, minus a per-key jitter.
		preemptive_window: Duration,
	},
}
impl TokenPolicy {
	/// Preemptive window used by [`TokenPolicy::cached`].
	pub const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

	/// Cached policy with the default 60 second window.
	pub const fn cached() -> Self {
		Self::Cached { preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW }
	}

	/// Cached policy with a custom window; negative windows are clamped to zero.
	pub fn cached_with_window(window: Duration) -> Self {
		Self::Cached { preemptive_window: window.max(Duration::ZERO) }
	}

	/// Returns `true` for [`TokenPolicy::Cached`].
	pub fn is_cached(&self) -> bool {
		matches!(self, Self::Cached { .. })
	}

	/// Whether `record` must be replaced before serving a call at `now`.
	pub fn should_refresh(&self, record: &TokenRecord, now: OffsetDateTime) -> bool {
		let window = match self {
			Self::PerRequest => return true,
			Self::Cached { preemptive_window } => *preemptive_window,
		};

		if record.is_revoked() || record.is_expired_at(now) {
			return true;
		}

		let effective = window.checked_sub(jitter(record, window)).unwrap_or(Duration::ZERO);

		if effective <= Duration::ZERO {
			return false;
		}

		record.remaining_at(now) <= effective
	}
}

// Spreads refreshes of different keys across the window so they do not all hit the provider
// at the same instant.
fn jitter(record: &TokenRecord, window: Duration) -> Duration {
	let window_secs = window.whole_seconds();

	if window_secs <= 1 {
		return Duration::ZERO;
	}

	let mut hasher = DefaultHasher::new();

	StoreKey::for_record(record).hash(&mut hasher);

	let modulus = u64::try_from(window_secs).unwrap_or(u64::MAX);
	let secs = i64::try_from(hasher.finish() % modulus).unwrap_or(0);

	Duration::seconds(secs)
}
