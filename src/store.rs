//! Token store contract and the in-memory implementation used by cached token policies.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ProviderId, ScopeSet, TokenRecord},
};

/// Boxed future returned by [`TokenStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend for issued access tokens.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the record for its provider/client/scope key.
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record stored under `key`, if present.
	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Marks the record under `key` as revoked at `instant`, returning the updated record.
	fn revoke<'a>(
		&'a self,
		key: &'a StoreKey,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Cache key for a stored token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// Provider that issues the token.
	pub provider: ProviderId,
	/// Client the token belongs to.
	pub client_id: ClientId,
	/// Fingerprint of the requested scope set.
	pub scope_fingerprint: String,
}
impl StoreKey {
	/// Builds a key for the provider/client/scope tuple.
	pub fn new(provider: &ProviderId, client_id: &ClientId, scope: &ScopeSet) -> Self {
		Self {
			provider: provider.clone(),
			client_id: client_id.clone(),
			scope_fingerprint: scope.fingerprint(),
		}
	}

	/// Key under which `record` is stored.
	pub fn for_record(record: &TokenRecord) -> Self {
		Self::new(&record.provider, &record.client_id, &record.scope)
	}
}
