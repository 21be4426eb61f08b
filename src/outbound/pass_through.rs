//! Forwards the inbound caller's identity and tenant scope to a downstream API.

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap};
// self
use crate::{
	_prelude::*,
	obs::AuthKind,
	outbound::{AuthFuture, InboundContext, RequestAuthenticator, TenantHeaderNames},
};

/// Copies `Authorization` and the agency/branch headers from an [`InboundContext`].
///
/// Built per inbound request; it holds no shared state and makes no network calls. Values that
/// are absent from the context are left off the outbound request.
#[derive(Clone, Debug, Default)]
pub struct PassThroughAuthenticator {
	context: InboundContext,
	names: TenantHeaderNames,
}
impl PassThroughAuthenticator {
	/// Forwards `context` using the given tenant header names.
	pub fn new(context: InboundContext, names: TenantHeaderNames) -> Self {
		Self { context, names }
	}

	/// Extracts the context from inbound headers and forwards it under the same names.
	pub fn from_headers(headers: &HeaderMap, names: TenantHeaderNames) -> Self {
		Self { context: InboundContext::from_headers(headers, &names), names }
	}

	/// Context being forwarded.
	pub fn context(&self) -> &InboundContext {
		&self.context
	}

	/// Applies the forwarded headers to `headers`, replacing existing values.
	pub fn apply(&self, headers: &mut HeaderMap) {
		if let Some(value) = self.context.authorization() {
			headers.insert(AUTHORIZATION, value.clone());
		}
		if let Some(value) = self.context.agency_id() {
			headers.insert(self.names.agency.clone(), value.clone());
		}
		if let Some(value) = self.context.branch_id() {
			headers.insert(self.names.branch.clone(), value.clone());
		}
	}
}
impl RequestAuthenticator for PassThroughAuthenticator {
	fn kind(&self) -> AuthKind {
		AuthKind::PassThrough
	}

	fn authenticate(&self, mut request: ReqwestRequest) -> AuthFuture<'_> {
		self.apply(request.headers_mut());

		Box::pin(async move { Ok(request) })
	}
}
