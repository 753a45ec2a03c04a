//! Persistent credential storage and the built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret, UserInfo},
};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value backend holding the session credentials under fixed keys.
///
/// Every single-key operation is atomic. [`save_tokens`](SessionStore::save_tokens) and
/// [`clear`](SessionStore::clear) touch several keys under one lock so concurrent readers never
/// observe half of a token pair.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the raw value stored under `key`.
	fn get(&self, key: StorageKey) -> StoreFuture<'_, Option<String>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: StorageKey, value: String) -> StoreFuture<'_, ()>;

	/// Removes the value stored under `key`.
	fn remove(&self, key: StorageKey) -> StoreFuture<'_, ()>;

	/// Replaces both tokens in a single write.
	fn save_tokens<'a>(&'a self, tokens: &'a TokenPair) -> StoreFuture<'a, ()>;

	/// Removes every session key in a single write.
	fn clear(&self) -> StoreFuture<'_, ()>;
}
impl dyn SessionStore {
	/// Reads the stored access token.
	pub async fn access_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.get(StorageKey::AccessToken).await?.filter(|v| !v.is_empty()).map(TokenSecret::new))
	}

	/// Reads the stored refresh token.
	pub async fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self
			.get(StorageKey::RefreshToken)
			.await?
			.filter(|v| !v.is_empty())
			.map(TokenSecret::new))
	}

	/// Reads and decodes the stored user profile.
	pub async fn user_info(&self) -> Result<Option<UserInfo>, StoreError> {
		match self.get(StorageKey::UserInfo).await? {
			Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
				StoreError::Serialization { message: format!("Failed to decode user info: {e}") }
			}),
			None => Ok(None),
		}
	}

	/// Encodes and stores the user profile.
	pub async fn save_user_info(&self, info: &UserInfo) -> Result<(), StoreError> {
		let raw = serde_json::to_string(info).map_err(|e| StoreError::Serialization {
			message: format!("Failed to encode user info: {e}"),
		})?;

		self.set(StorageKey::UserInfo, raw).await
	}
}

/// Fixed keys under which session state is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StorageKey {
	/// Current access token.
	AccessToken,
	/// Current refresh token.
	RefreshToken,
	/// JSON-encoded [`UserInfo`].
	UserInfo,
}
impl StorageKey {
	/// Every key owned by the session.
	pub const ALL: [Self; 3] = [Self::AccessToken, Self::RefreshToken, Self::UserInfo];

	/// Returns the persisted key name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AccessToken => "skyeye_access_token",
			Self::RefreshToken => "skyeye_refresh_token",
			Self::UserInfo => "skyeye_user_info",
		}
	}
}
impl Display for StorageKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error type produced by [`SessionStore`] implementations.
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

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk full"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn storage_keys_use_fixed_names() {
		let names: Vec<_> = StorageKey::ALL.iter().map(|k| k.as_str()).collect();

		assert_eq!(names, ["skyeye_access_token", "skyeye_refresh_token", "skyeye_user_info"]);
	}
}
