//! Issued access-token records and their builder.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ProviderId, ScopeSet, token::secret::TokenSecret},
};

/// Lifecycle status of a token record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Issued-at lies in the future.
	Pending,
	/// Token is currently valid.
	Active,
	/// Token reached its expiry instant.
	Expired,
	/// Token was revoked locally.
	Revoked,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// No access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// No expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// The relative lifetime pushes the expiry past the representable calendar range.
	#[error("Token lifetime overflows the supported date range.")]
	ExpiryOutOfRange,
}

/// Access token issued to a client by an identity provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Provider that minted the token.
	pub provider: ProviderId,
	/// Client the token was issued to.
	pub client_id: ClientId,
	/// Scopes granted to the token.
	pub scope: ScopeSet,
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Instant the token was issued.
	pub issued_at: OffsetDateTime,
	/// Instant the token stops being usable.
	pub expires_at: OffsetDateTime,
	/// Revocation instant, if revoked.
	pub revoked_at: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Returns a builder for the provider/client/scope tuple.
	pub fn builder(
		provider: ProviderId,
		client_id: ClientId,
		scope: ScopeSet,
	) -> TokenRecordBuilder {
		TokenRecordBuilder {
			provider,
			client_id,
			scope,
			access_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Computes the lifecycle status at `instant`.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if self.revoked_at.is_some() {
			return TokenStatus::Revoked;
		}
		if instant < self.issued_at {
			return TokenStatus::Pending;
		}
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Status relative to the current UTC clock.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record has expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Time left before expiry at `instant`; negative once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}

	/// Returns `true` if the record has been revoked.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Marks the record as revoked.
	pub fn revoke(&mut self, instant: OffsetDateTime) {
		self.revoked_at = Some(instant);
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("provider", &self.provider)
			.field("client_id", &self.client_id)
			.field("scope", &self.scope)
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("revoked_at", &self.revoked_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	provider: ProviderId,
	client_id: ClientId,
	scope: ScopeSet,
	access_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	/// Sets the issued-at instant (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the lifetime relative to the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(TokenRecordBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord {
			provider: self.provider,
			client_id: self.client_id,
			scope: self.scope,
			access_token,
			issued_at,
			expires_at,
			revoked_at: None,
		})
	}
}
