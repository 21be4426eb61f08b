//! Reqwest transport used for token endpoint exchanges.
//!
//! [`ReqwestHttpClient`] hands out short-lived [`InstrumentedHandle`]s that the `oauth2`
//! crate drives. Each handle records the HTTP status and `Retry-After` hint of the response it
//! saw into a [`ResponseMetadataSlot`], so error mapping can attach them to transient failures.

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Metadata from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Shared slot the transport writes [`ResponseMetadata`] into.
///
/// A fresh slot is created for every token request, so concurrent fetches never observe each
/// other's metadata.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Reqwest client used for token exchanges, with an optional per-request timeout.
///
/// Token endpoints answer directly, so a custom client should not follow redirects.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient {
	client: ReqwestClient,
	timeout: Option<StdDuration>,
}
impl ReqwestHttpClient {
	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, timeout: None }
	}

	/// Bounds every token request by `timeout`; expiry surfaces as a transient error.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Configured per-request timeout.
	pub fn timeout(&self) -> Option<StdDuration> {
		self.timeout
	}

	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle(Arc::new(Instrumented {
			client: self.client.clone(),
			timeout: self.timeout,
			slot,
		}))
	}
}

struct Instrumented {
	client: ReqwestClient,
	timeout: Option<StdDuration>,
	slot: ResponseMetadataSlot,
}

/// [`AsyncHttpClient`] adapter that records response metadata.
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<Instrumented>);
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let inner = Arc::clone(&self.0);

		Box::pin(async move {
			inner.slot.take();

			let mut request: ReqwestRequest = request.try_into().map_err(Box::new)?;

			if let Some(timeout) = inner.timeout {
				*request.timeout_mut() = Some(timeout);
			}

			let response = inner.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			inner.slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				retry_after: parse_retry_after(&headers),
			});

			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	// Negative delay-seconds are not valid and fall through to the date form, which rejects them.
	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}

	let delta = OffsetDateTime::parse(raw, &Rfc2822).ok()? - OffsetDateTime::now_utc();

	delta.is_positive().then_some(delta)
}
