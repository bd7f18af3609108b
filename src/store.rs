//! Credential storage contract and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

// self
use crate::{_prelude::*, auth::Credential};

/// Storage backend holding the single live access credential.
///
/// Reads are synchronous so the request decorator can observe the live value at the moment a
/// request is built. Implementations must treat an expired credential as absent.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists the credential, atomically replacing any previous one.
	fn save(&self, credential: Credential) -> Result<(), StoreError>;

	/// Returns the live credential, if one exists and has not expired.
	fn load(&self) -> Option<Credential>;

	/// Removes the live credential.
	fn clear(&self) -> Result<(), StoreError>;
}

/// Error type produced by [`CredentialStore`] implementations.
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

fn live(credential: Option<&Credential>, now: OffsetDateTime) -> Option<Credential> {
	credential.filter(|value| !value.is_expired_at(now)).cloned()
}
