//! Short-lived access credential with an implicit expiry.

// self
use crate::{_prelude::*, auth::CredentialSecret};

/// Current short-lived access credential.
///
/// Only one credential is live at a time; writing a new one replaces the previous value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Bearer value; callers must avoid logging it.
	pub token: CredentialSecret,
	/// Lifetime granted when the credential was written.
	pub ttl: Duration,
	/// Instant the credential was written.
	pub issued_at: OffsetDateTime,
}
impl Credential {
	/// Creates a credential issued now with the provided lifetime.
	pub fn new(token: impl Into<String>, ttl: Duration) -> Self {
		Self::issued_at(token, ttl, OffsetDateTime::now_utc())
	}

	/// Creates a credential issued at an explicit instant.
	pub fn issued_at(token: impl Into<String>, ttl: Duration, issued_at: OffsetDateTime) -> Self {
		Self { token: CredentialSecret::new(token), ttl, issued_at }
	}

	/// Expiry instant derived from `issued_at + ttl`.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at.saturating_add(self.ttl)
	}

	/// Returns `true` if the credential has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at()
	}

	/// Returns `true` if the credential is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("token", &"<redacted>")
			.field("ttl", &self.ttl)
			.field("issued_at", &self.issued_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn expiry_follows_ttl() {
		let issued = datetime!(2025-01-01 00:00 UTC);
		let credential = Credential::issued_at("abc", Duration::minutes(15), issued);

		assert_eq!(credential.expires_at(), datetime!(2025-01-01 00:15 UTC));
		assert!(!credential.is_expired_at(datetime!(2025-01-01 00:14:59 UTC)));
		assert!(credential.is_expired_at(datetime!(2025-01-01 00:15 UTC)));
	}

	#[test]
	fn debug_redacts_token() {
		let credential = Credential::new("top-secret", Duration::minutes(1));
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("top-secret"));
		assert!(rendered.contains("<redacted>"));
	}
}
