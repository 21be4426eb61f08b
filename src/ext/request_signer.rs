//! Request signing contracts that attach issued tokens to outbound requests.

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderValue};
// self
use crate::{_prelude::*, auth::TokenRecord, error::ConfigError};

/// Attaches a [`TokenRecord`] to an outbound request without constraining the client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the request and returns it carrying authorization derived from `record`.
	fn attach_token(&self, request: Request, record: &TokenRecord) -> Result<Request, Error>;
}

/// Signs reqwest requests with `Authorization: Bearer <token>`, replacing any existing value.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl BearerSigner {
	/// Builds the sensitive `Authorization` header value for `record`.
	pub fn header_value(record: &TokenRecord) -> Result<HeaderValue, ConfigError> {
		let mut value = HeaderValue::from_str(&record.access_token.bearer())
			.map_err(|_| ConfigError::invalid_header_value(AUTHORIZATION))?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl RequestSignerExt<ReqwestRequest, ConfigError> for BearerSigner {
	fn attach_token(
		&self,
		mut request: ReqwestRequest,
		record: &TokenRecord,
	) -> Result<ReqwestRequest, ConfigError> {
		request.headers_mut().insert(AUTHORIZATION, Self::header_value(record)?);

		Ok(request)
	}
}
