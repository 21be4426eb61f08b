// self
use crate::{_prelude::*, obs::AuthKind};

/// Instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedSend<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedSend<F> = F;

/// Span wrapping one authenticated send or token fetch.
#[derive(Clone, Debug)]
pub struct AuthSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AuthSpan {
	/// Span for a send to `service` decorated by a `kind` authenticator.
	pub fn new(kind: AuthKind, stage: &'static str, service: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("outbound_auth.request", kind = kind.as_str(), stage, service);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, service);

			Self {}
		}
	}

	/// Span for a token endpoint exchange against `provider`.
	pub fn token(provider: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::debug_span!("outbound_auth.token", provider) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = provider;

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedSend<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a token-acquisition failure inside the current span.
pub fn log_token_failure(kind: AuthKind, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(kind = kind.as_str(), error = %error, "outbound request not sent");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Logs a token reuse or fetch decision at `debug`.
pub fn log_token_source(provider: &str, cached: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(provider, cached, "bearer token resolved");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (provider, cached);
	}
}

/// Logs a failure to revoke a cached token after a downstream `401`.
pub fn log_invalidation_failure(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(error = %error, "cached token could not be revoked");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
