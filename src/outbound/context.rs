//! Explicit inbound request context forwarded by the pass-through authenticator.

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
// self
use crate::{_prelude::*, error::ConfigError};

/// Header names carrying the tenant-scoping identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantHeaderNames {
	/// Agency identifier header.
	pub agency: HeaderName,
	/// Branch identifier header.
	pub branch: HeaderName,
}
impl TenantHeaderNames {
	/// Default agency header name.
	pub const DEFAULT_AGENCY: &'static str = "x-agency-id";
	/// Default branch header name.
	pub const DEFAULT_BRANCH: &'static str = "x-branch-id";

	/// Parses custom header names.
	pub fn new(agency: &str, branch: &str) -> Result<Self, ConfigError> {
		Ok(Self { agency: parse_name(agency)?, branch: parse_name(branch)? })
	}
}
impl Default for TenantHeaderNames {
	fn default() -> Self {
		Self {
			agency: HeaderName::from_static(Self::DEFAULT_AGENCY),
			branch: HeaderName::from_static(Self::DEFAULT_BRANCH),
		}
	}
}

/// Values taken from the inbound request that triggered an outbound call.
///
/// Every field is optional and opaque; absent values are simply not forwarded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboundContext {
	authorization: Option<HeaderValue>,
	agency_id: Option<HeaderValue>,
	branch_id: Option<HeaderValue>,
}
impl InboundContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Extracts the forwarded values from inbound request headers.
	pub fn from_headers(headers: &HeaderMap, names: &TenantHeaderNames) -> Self {
		Self {
			authorization: headers.get(AUTHORIZATION).cloned().map(sensitive),
			agency_id: headers.get(&names.agency).cloned(),
			branch_id: headers.get(&names.branch).cloned(),
		}
	}

	/// Sets the inbound `Authorization` value, e.g. `Bearer abc123`.
	pub fn with_authorization(mut self, value: &str) -> Result<Self, ConfigError> {
		let value = HeaderValue::from_str(value)
			.map_err(|_| ConfigError::invalid_header_value(AUTHORIZATION))?;

		self.authorization = Some(sensitive(value));

		Ok(self)
	}

	/// Sets the agency identifier.
	pub fn with_agency_id(mut self, value: impl Display) -> Result<Self, ConfigError> {
		self.agency_id = Some(header_value("agency", value)?);

		Ok(self)
	}

	/// Sets the branch identifier.
	pub fn with_branch_id(mut self, value: impl Display) -> Result<Self, ConfigError> {
		self.branch_id = Some(header_value("branch", value)?);

		Ok(self)
	}

	/// Inbound `Authorization` value.
	pub fn authorization(&self) -> Option<&HeaderValue> {
		self.authorization.as_ref()
	}

	/// Agency identifier.
	pub fn agency_id(&self) -> Option<&HeaderValue> {
		self.agency_id.as_ref()
	}

	/// Branch identifier.
	pub fn branch_id(&self) -> Option<&HeaderValue> {
		self.branch_id.as_ref()
	}
}

fn sensitive(mut value: HeaderValue) -> HeaderValue {
	value.set_sensitive(true);

	value
}

fn header_value(label: &str, value: impl Display) -> Result<HeaderValue, ConfigError> {
	HeaderValue::from_str(&value.to_string()).map_err(|_| ConfigError::invalid_header_value(label))
}

fn parse_name(name: &str) -> Result<HeaderName, ConfigError> {
	HeaderName::from_bytes(name.as_bytes())
		.map_err(|_| ConfigError::InvalidHeaderName { name: name.to_owned() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn from_headers_picks_configured_names() {
		let names = TenantHeaderNames::new("AgencyId", "BranchId")
			.expect("Custom header names should parse.");
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
		headers.insert("agencyid", HeaderValue::from_static("7"));
		headers.insert("x-branch-id", HeaderValue::from_static("3"));

		let ctx = InboundContext::from_headers(&headers, &names);

		assert_eq!(ctx.authorization().map(HeaderValue::as_bytes), Some(&b"Bearer abc123"[..]));
		assert!(ctx.authorization().is_some_and(HeaderValue::is_sensitive));
		assert_eq!(ctx.agency_id().map(HeaderValue::as_bytes), Some(&b"7"[..]));
		assert!(ctx.branch_id().is_none(), "Only the configured branch header is read.");
	}

	#[test]
	fn builder_accepts_numeric_ids_and_rejects_control_bytes() {
		let ctx = InboundContext::new()
			.with_agency_id(7)
			.and_then(|ctx| ctx.with_branch_id(3))
			.expect("Numeric identifiers should be valid header values.");

		assert_eq!(ctx.agency_id().map(HeaderValue::as_bytes), Some(&b"7"[..]));
		assert_eq!(ctx.branch_id().map(HeaderValue::as_bytes), Some(&b"3"[..]));
		assert!(matches!(
			InboundContext::new().with_authorization("Bearer a\r\nX-Injected: 1"),
			Err(ConfigError::InvalidHeaderValue { .. })
		));
	}

	#[test]
	fn invalid_header_names_are_rejected() {
		assert!(matches!(
			TenantHeaderNames::new("agency id", "branch"),
			Err(ConfigError::InvalidHeaderName { .. })
		));
	}
}
