//! Provider strategy hooks that customize token requests and classify failures.

// self
use crate::_prelude::*;

/// Strategy hook that lets a provider decorate token requests and classify errors.
///
/// Hooks only see crate-owned data so implementations never depend on the HTTP stack.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed token response into the crate's error taxonomy.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific form parameters (`audience`, `resource`, ...) before dispatch.
	fn augment_token_request(&self, _form: &mut BTreeMap<String, String>) {}
}

/// Provider error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Provider rejected the grant.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes are not allowed for this client.
	InsufficientScope,
	/// Failure is temporary.
	Transient,
}

/// Failure details handed to [`ProviderStrategy::classify_token_error`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Truncated response body for error statuses without an OAuth error document.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, truncated to 256 characters.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		let body: String = body.into();
		let preview = if body.chars().count() <= Self::BODY_PREVIEW_LIMIT {
			body
		} else {
			let mut buf: String = body.chars().take(Self::BODY_PREVIEW_LIMIT).collect();

			buf.push('…');

			buf
		};

		self.body_preview = Some(preview);

		self
	}
}

/// Classifies by OAuth `error` code, then description and body hints, then HTTP status.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		ctx.oauth_error
			.as_deref()
			.and_then(match_error_code)
			.or_else(|| ctx.error_description.as_deref().and_then(match_error_code))
			.or_else(|| ctx.error_description.as_deref().and_then(match_hint))
			.or_else(|| ctx.body_preview.as_deref().and_then(match_hint))
			.unwrap_or_else(|| match_status(ctx.http_status))
	}
}

fn match_error_code(value: &str) -> Option<ProviderErrorKind> {
	let is = |code: &str| value.eq_ignore_ascii_case(code);

	if is("invalid_grant") || is("access_denied") || is("unsupported_grant_type") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if is("invalid_client") || is("unauthorized_client") {
		Some(ProviderErrorKind::InvalidClient)
	} else if is("invalid_scope") || is("insufficient_scope") {
		Some(ProviderErrorKind::InsufficientScope)
	} else if is("temporarily_unavailable") || is("server_error") {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn match_hint(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	if lowered.contains("invalid_grant") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if lowered.contains("invalid_client") {
		Some(ProviderErrorKind::InvalidClient)
	} else if lowered.contains("invalid_scope") || lowered.contains("insufficient_scope") {
		Some(ProviderErrorKind::InsufficientScope)
	} else if lowered.contains("temporarily_unavailable") {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn match_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}
