//! Optional observability helpers for authenticated sends.
//!
//! # Feature Flags
//!
//! - `tracing` (default) wraps every send in an `outbound_auth.request` span with `kind`,
//!   `stage`, and `service` fields, and logs token failures at `warn`.
//! - `metrics` increments the `outbound_auth_request_total` counter labeled by `kind` and
//!   `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Authenticator variants observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthKind {
	/// Client-credentials token fetched on behalf of the process.
	ServiceCredential,
	/// Inbound end-user identity forwarded downstream.
	PassThrough,
}
impl AuthKind {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthKind::ServiceCredential => "service_credential",
			AuthKind::PassThrough => "pass_through",
		}
	}
}
impl Display for AuthKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthOutcome {
	/// Entry to an authenticated send.
	Attempt,
	/// A downstream response was obtained.
	Success,
	/// Authorization could not be established; nothing was sent.
	TokenFailure,
	/// The downstream transport failed.
	DownstreamFailure,
}
impl AuthOutcome {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthOutcome::Attempt => "attempt",
			AuthOutcome::Success => "success",
			AuthOutcome::TokenFailure => "token_failure",
			AuthOutcome::DownstreamFailure => "downstream_failure",
		}
	}
}
impl Display for AuthOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
