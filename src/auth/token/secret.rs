//! Access-token and client-secret material.

// crates.io
use reqwest::header::HeaderValue;
// self
use crate::_prelude::*;

const BEARER_PREFIX: &str = "Bearer ";

/// Secret string that renders as `<redacted>` in logs and debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Renders the `Bearer <token>` credential used in `Authorization` headers.
	pub fn bearer(&self) -> String {
		format!("{BEARER_PREFIX}{}", self.0)
	}

	/// Returns `true` when `header` is the bearer credential for this secret.
	///
	/// The scheme is matched case-insensitively; the token itself must match exactly.
	pub fn is_bearer_of(&self, header: &HeaderValue) -> bool {
		let Ok(value) = header.to_str() else {
			return false;
		};

		value.len() == BEARER_PREFIX.len() + self.0.len()
			&& value[..BEARER_PREFIX.len()].eq_ignore_ascii_case(BEARER_PREFIX)
			&& value[BEARER_PREFIX.len()..] == self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
