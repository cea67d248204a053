//! Session context owning the credential store handle and its key layout.
//!
//! A [`Session`] is created once per signed-in user agent and injected into the client. Login
//! establishes the credential pair, refresh overwrites the access token, and logout (or an
//! unrecoverable refresh failure) tears both credentials down.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	config::CredentialKeys,
	store::{CredentialStore, StoreError},
};

/// Credential context shared by every request issued on behalf of one user agent.
#[derive(Clone)]
pub struct Session {
	store: Arc<dyn CredentialStore>,
	keys: CredentialKeys,
}
impl Session {
	/// Binds a session to `store` using `keys` for the two credentials.
	pub fn new(store: Arc<dyn CredentialStore>, keys: CredentialKeys) -> Self {
		Self { store, keys }
	}

	/// Store key layout.
	pub fn keys(&self) -> &CredentialKeys {
		&self.keys
	}

	/// Persists both credentials issued at login.
	pub async fn establish(&self, pair: CredentialPair) -> Result<(), StoreError> {
		self.store.set(&self.keys.access, pair.access_token.expose().to_owned()).await?;
		self.store.set(&self.keys.refresh, pair.refresh_token.expose().to_owned()).await
	}

	/// Current access token, if stored.
	pub async fn access_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.store.get(&self.keys.access).await?.map(TokenSecret::new))
	}

	/// Current refresh token, if stored.
	pub async fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.store.get(&self.keys.refresh).await?.map(TokenSecret::new))
	}

	/// Both credentials, when the session is fully established.
	pub async fn credentials(&self) -> Result<Option<CredentialPair>, StoreError> {
		let access = self.access_token().await?;
		let refresh = self.refresh_token().await?;

		Ok(access.zip(refresh).map(|(access_token, refresh_token)| CredentialPair {
			access_token,
			refresh_token,
		}))
	}

	/// Returns `true` while an access token is stored.
	pub async fn is_authenticated(&self) -> Result<bool, StoreError> {
		Ok(self.access_token().await?.is_some())
	}

	/// Overwrites the access token after a successful refresh.
	pub(crate) async fn replace_access_token(&self, token: &TokenSecret) -> Result<(), StoreError> {
		self.store.set(&self.keys.access, token.expose().to_owned()).await
	}

	/// Removes both credentials.
	///
	/// Both removals are attempted even if the first one fails; the first failure is returned.
	pub async fn clear(&self) -> Result<(), StoreError> {
		let access = self.store.remove(&self.keys.access).await;
		let refresh = self.store.remove(&self.keys.refresh).await;

		access.and(refresh).map(|_| ())
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session").field("keys", &self.keys).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn session() -> (Session, MemoryStore) {
		let store = MemoryStore::default();

		(Session::new(Arc::new(store.clone()), CredentialKeys::default()), store)
	}

	#[tokio::test]
	async fn establish_refresh_and_clear_lifecycle() {
		let (session, store) = session();

		assert!(!session.is_authenticated().await.expect("Store read should succeed."));
		assert_eq!(session.credentials().await.expect("Store read should succeed."), None);

		session
			.establish(CredentialPair::new("access-1", "refresh-1"))
			.await
			.expect("Login should persist credentials.");

		assert_eq!(store.peek("access_token").as_deref(), Some("access-1"));
		assert_eq!(store.peek("refresh_token").as_deref(), Some("refresh-1"));

		session
			.replace_access_token(&TokenSecret::new("access-2"))
			.await
			.expect("Refresh should overwrite the access token.");

		let pair = session
			.credentials()
			.await
			.expect("Store read should succeed.")
			.expect("Both credentials should be present.");

		assert_eq!(pair, CredentialPair::new("access-2", "refresh-1"));

		session.clear().await.expect("Logout should clear credentials.");

		assert!(store.is_empty());
		assert!(!session.is_authenticated().await.expect("Store read should succeed."));
	}

	#[tokio::test]
	async fn custom_keys_are_honoured() {
		let store = MemoryStore::default();
		let session = Session::new(
			Arc::new(store.clone()),
			CredentialKeys { access: "mkt.at".into(), refresh: "mkt.rt".into() },
		);

		session
			.establish(CredentialPair::new("a", "r"))
			.await
			.expect("Login should persist credentials.");

		assert_eq!(store.peek("mkt.at").as_deref(), Some("a"));
		assert_eq!(store.peek("access_token"), None);
	}
}
