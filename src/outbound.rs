//! Outbound request authentication.
//!
//! A [`RequestAuthenticator`] decorates an outbound [`reqwest::Request`] with authorization
//! headers. Two variants ship with the crate:
//!
//! - [`ServiceCredentialAuthenticator`] obtains a client-credentials token from the identity
//!   provider and attaches it as `Authorization: Bearer <token>`.
//! - [`PassThroughAuthenticator`] forwards the inbound caller's `Authorization` header and the
//!   agency/branch tenant headers, taken from an explicit [`InboundContext`].
//!
//! [`AuthenticatedClient`] wraps the normal send path to one [`Downstream`] service: it
//! authenticates, delegates to [`reqwest::Client::execute`], and returns the response
//! unmodified. Failures come back as [`SendError`], which separates "never sent because
//! authorization failed" from "the downstream call failed".
//!
//! [`execute`](AuthenticatedClient::execute) is a single future covering the token fetch and
//! the downstream call. Dropping it (for example through `tokio::time::timeout` or a
//! cancelled inbound request) aborts an in-flight token fetch and nothing is sent.

pub mod context;
pub mod metrics;
pub mod pass_through;
pub mod policy;
pub mod service_credential;

pub use context::*;
pub use metrics::*;
pub use pass_through::*;
pub use policy::*;
pub use service_credential::*;

// crates.io
use reqwest::{
	Method, RequestBuilder, StatusCode,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	error::{PathError, SendError},
	obs::{self, AuthKind, AuthOutcome, AuthSpan},
};

/// Boxed future returned by [`RequestAuthenticator::authenticate`].
pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<ReqwestRequest>> + 'a + Send>>;

/// Decorates outbound requests with authorization state.
///
/// `authenticate` consumes the request and hands it back decorated. On failure the request is
/// dropped, so a caller can never send it unauthenticated by accident.
pub trait RequestAuthenticator
where
	Self: Send + Sync,
{
	/// Variant label used for spans and metrics.
	fn kind(&self) -> AuthKind;

	/// Decorates `request` with authorization headers.
	fn authenticate(&self, request: ReqwestRequest) -> AuthFuture<'_>;

	/// Called after the downstream answered `401 Unauthorized`.
	///
	/// `sent` is the `Authorization` value the rejected request carried, if any.
	fn on_unauthorized<'a>(
		&'a self,
		_sent: Option<&'a HeaderValue>,
	) -> Pin<Box<dyn Future<Output = ()> + 'a + Send>> {
		Box::pin(async {})
	}
}
impl<A> RequestAuthenticator for Arc<A>
where
	A: ?Sized + RequestAuthenticator,
{
	fn kind(&self) -> AuthKind {
		(**self).kind()
	}

	fn authenticate(&self, request: ReqwestRequest) -> AuthFuture<'_> {
		(**self).authenticate(request)
	}

	fn on_unauthorized<'a>(
		&'a self,
		sent: Option<&'a HeaderValue>,
	) -> Pin<Box<dyn Future<Output = ()> + 'a + Send>> {
		(**self).on_unauthorized(sent)
	}
}

/// Named downstream HTTP service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Downstream {
	/// Service name used in spans.
	pub name: String,
	/// Base URL that relative request paths resolve against.
	pub base_url: Url,
}
impl Downstream {
	/// Creates a downstream descriptor.
	pub fn new(name: impl Into<String>, base_url: Url) -> Self {
		Self { name: name.into(), base_url }
	}

	/// Resolves `path` beneath the base URL.
	///
	/// Leading slashes are ignored, so `/meters` under `https://core/api` becomes
	/// `https://core/api/meters`. Absolute URLs and `..` segments that land on another origin
	/// or above the base path are refused, so credentials only ever travel to this service.
	pub fn resolve(&self, path: &str) -> Result<Url, PathError> {
		let mut base = self.base_url.clone();

		if !base.path().ends_with('/') {
			let with_slash = format!("{}/", base.path());

			base.set_path(&with_slash);
		}

		let resolved = base.join(path.trim_start_matches('/'))?;

		if resolved.origin() != base.origin() || !resolved.path().starts_with(base.path()) {
			return Err(PathError::OutsideBase { resolved });
		}

		Ok(resolved)
	}
}

/// HTTP client that authenticates every request it sends to one downstream service.
#[derive(Clone, Debug)]
pub struct AuthenticatedClient<A> {
	client: ReqwestClient,
	downstream: Downstream,
	authenticator: A,
}
impl<A> AuthenticatedClient<A>
where
	A: RequestAuthenticator,
{
	/// Wraps `client` so every request to `downstream` passes through `authenticator`.
	pub fn new(client: ReqwestClient, downstream: Downstream, authenticator: A) -> Self {
		Self { client, downstream, authenticator }
	}

	/// Target service.
	pub fn downstream(&self) -> &Downstream {
		&self.downstream
	}

	/// Authenticator applied to each request.
	pub fn authenticator(&self) -> &A {
		&self.authenticator
	}

	/// Starts a request for `path` relative to the downstream base URL.
	pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, SendError> {
		let url = self
			.downstream
			.resolve(path)
			.map_err(|source| SendError::InvalidPath { path: path.to_owned(), source })?;

		Ok(self.client.request(method, url))
	}

	/// Builds and executes `builder`.
	pub async fn send(&self, builder: RequestBuilder) -> Result<ReqwestResponse, SendError> {
		let request = builder.build().map_err(SendError::Downstream)?;

		self.execute(request).await
	}

	/// Authenticates `request`, sends it, and returns the downstream response unmodified.
	pub async fn execute(&self, request: ReqwestRequest) -> Result<ReqwestResponse, SendError> {
		let kind = self.authenticator.kind();
		let span = AuthSpan::new(kind, "execute", &self.downstream.name);

		obs::record_outcome(kind, AuthOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = match self.authenticator.authenticate(request).await {
					Ok(request) => request,
					Err(e) => {
						obs::log_token_failure(kind, &e);

						return Err(SendError::Token(e));
					},
				};
				let sent = request.headers().get(AUTHORIZATION).cloned();
				let response = self.client.execute(request).await.map_err(SendError::Downstream)?;

				if response.status() == StatusCode::UNAUTHORIZED {
					self.authenticator.on_unauthorized(sent.as_ref()).await;
				}

				Ok(response)
			})
			.await;
		let outcome = match &result {
			Ok(_) => AuthOutcome::Success,
			Err(SendError::Token(_)) => AuthOutcome::TokenFailure,
			Err(_) => AuthOutcome::DownstreamFailure,
		};

		obs::record_outcome(kind, outcome);

		result
	}
}
