//! Thread-safe in-memory [`TokenStore`].

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{StoreError, StoreFuture, StoreKey, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, TokenRecord>>>;

/// Process-local token store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn revoke_now(map: &StoreMap, key: &StoreKey, instant: OffsetDateTime) -> Option<TokenRecord> {
		let mut guard = map.write();
		let record = guard.get_mut(key)?;

		record.revoke(instant);

		Some(record.clone())
	}
}
impl TokenStore for MemoryStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(StoreKey::for_record(&record), record);

			Ok::<_, StoreError>(())
		})
	}

	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(key).cloned()) })
	}

	fn revoke<'a>(
		&'a self,
		key: &'a StoreKey,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::revoke_now(&map, key, instant)) })
	}
}
