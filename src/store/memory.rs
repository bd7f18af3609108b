//! Thread-safe in-memory [`CredentialStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{self, CredentialStore, StoreError},
};

/// Storage backend that keeps the credential in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialStore(Arc<RwLock<Option<Credential>>>);
impl MemoryCredentialStore {
	/// Creates a store pre-seeded with a credential.
	pub fn with_credential(credential: Credential) -> Self {
		Self(Arc::new(RwLock::new(Some(credential))))
	}

	/// Returns the raw stored value, ignoring expiry.
	pub fn peek(&self) -> Option<Credential> {
		self.0.read().clone()
	}
}
impl CredentialStore for MemoryCredentialStore {
	fn save(&self, credential: Credential) -> Result<(), StoreError> {
		*self.0.write() = Some(credential);

		Ok(())
	}

	fn load(&self) -> Option<Credential> {
		store::live(self.0.read().as_ref(), OffsetDateTime::now_utc())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}
}
