// self
use crate::obs::{AuthKind, AuthOutcome};

/// Records a send outcome via the global metrics recorder (when enabled).
pub fn record_outcome(kind: AuthKind, outcome: AuthOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"outbound_auth_request_total",
			"kind" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
