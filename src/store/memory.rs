//! Thread-safe in-memory [`SessionStore`] for tests, demos, and short-lived processes.

// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	store::{SessionStore, StorageKey, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<BTreeMap<StorageKey, String>>>;

/// Storage backend that keeps session values in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns a copy of every stored value, keyed by persisted name.
	pub fn snapshot(&self) -> BTreeMap<&'static str, String> {
		self.0.read().iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
	}

	/// Returns `true` if no session key is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_tokens_now(map: StoreMap, tokens: &TokenPair) -> Result<(), StoreError> {
		let mut guard = map.write();

		guard.insert(StorageKey::AccessToken, tokens.access_token.expose().to_owned());
		guard.insert(StorageKey::RefreshToken, tokens.refresh_token.expose().to_owned());

		Ok(())
	}
}
impl SessionStore for MemoryStore {
	fn get(&self, key: StorageKey) -> StoreFuture<'_, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn set(&self, key: StorageKey, value: String) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key, value);

			Ok(())
		})
	}

	fn remove(&self, key: StorageKey) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(&key);

			Ok(())
		})
	}

	fn save_tokens<'a>(&'a self, tokens: &'a TokenPair) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_tokens_now(map, tokens) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().clear();

			Ok(())
		})
	}
}
