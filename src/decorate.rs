//! Request decoration: live credential and locale headers.

// self
use crate::{_prelude::*, http::OutgoingRequest, store::CredentialStore};

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "authorization";

/// Source of the currently active locale.
pub trait LocaleSource
where
	Self: Send + Sync,
{
	/// Returns the locale tag that should accompany the next request.
	fn current_locale(&self) -> String;
}

/// Process-wide locale cell updated by the hosting application.
#[derive(Debug)]
pub struct LocaleState(RwLock<String>);
impl LocaleState {
	/// Creates the cell with an initial locale tag.
	pub fn new(locale: impl Into<String>) -> Self {
		Self(RwLock::new(locale.into()))
	}

	/// Switches the active locale; subsequent requests observe the new value.
	pub fn set(&self, locale: impl Into<String>) {
		*self.0.write() = locale.into();
	}

	/// Returns the active locale.
	pub fn get(&self) -> String {
		self.0.read().clone()
	}
}
impl Default for LocaleState {
	fn default() -> Self {
		Self::new("en")
	}
}
impl LocaleSource for LocaleState {
	fn current_locale(&self) -> String {
		self.get()
	}
}

/// Stamps outgoing requests with the authorization and locale headers.
///
/// Both values are read at the moment a request is built, never cached, so a credential
/// written mid-episode is visible to every request built afterwards.
#[derive(Clone)]
pub struct RequestDecorator {
	store: Arc<dyn CredentialStore>,
	locale: Arc<dyn LocaleSource>,
	token_type: String,
	locale_header: String,
}
impl RequestDecorator {
	/// Creates a decorator reading from the provided store and locale source.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		locale: Arc<dyn LocaleSource>,
		token_type: impl Into<String>,
		locale_header: impl Into<String>,
	) -> Self {
		Self { store, locale, token_type: token_type.into(), locale_header: locale_header.into() }
	}

	/// Builds the authorization value for a given credential string.
	pub fn authorization_for(&self, token: &str) -> String {
		format!("{} {token}", self.token_type)
	}

	/// Builds the authorization value from the live credential.
	///
	/// A missing credential yields the prefix followed by an empty value.
	pub fn authorization_value(&self) -> String {
		match self.store.load() {
			Some(credential) => self.authorization_for(credential.token.expose()),
			None => self.authorization_for(""),
		}
	}

	/// Sets the authorization and locale headers on the request.
	pub fn decorate(&self, request: &mut OutgoingRequest) {
		request.headers.insert(AUTHORIZATION, self.authorization_value());
		self.decorate_locale(request);
	}

	/// Sets only the locale header; used for calls that must not carry the access credential.
	pub fn decorate_locale(&self, request: &mut OutgoingRequest) {
		request.headers.insert(&self.locale_header, self.locale.current_locale());
	}
}
impl Debug for RequestDecorator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestDecorator")
			.field("token_type", &self.token_type)
			.field("locale_header", &self.locale_header)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::Credential,
		http::{HeaderBag, Method},
		store::MemoryCredentialStore,
	};

	fn outgoing() -> OutgoingRequest {
		OutgoingRequest {
			method: Method::Get,
			url: Url::parse("https://api.example.com/products")
				.expect("Fixture URL should parse successfully."),
			headers: HeaderBag::new(),
			body: None,
			timeout: None,
		}
	}

	fn decorator(
		store: Arc<MemoryCredentialStore>,
		locale: Arc<LocaleState>,
	) -> RequestDecorator {
		RequestDecorator::new(store, locale, "Bearer", "Accept-Language")
	}

	#[test]
	fn stamps_live_credential_and_locale() {
		let store = Arc::new(MemoryCredentialStore::default());
		let locale = Arc::new(LocaleState::new("en"));
		let decorator = decorator(store.clone(), locale.clone());

		store.save(Credential::new("first", Duration::minutes(5))).expect("Save should succeed.");

		let mut request = outgoing();

		decorator.decorate(&mut request);

		assert_eq!(request.headers.get("Authorization"), Some("Bearer first"));
		assert_eq!(request.headers.get("accept-language"), Some("en"));

		store.save(Credential::new("second", Duration::minutes(5))).expect("Save should succeed.");
		locale.set("fr");

		let mut request = outgoing();

		decorator.decorate(&mut request);

		assert_eq!(request.headers.get("authorization"), Some("Bearer second"));
		assert_eq!(request.headers.get("Accept-Language"), Some("fr"));
	}

	#[test]
	fn missing_credential_yields_empty_bearer() {
		let decorator =
			decorator(Arc::new(MemoryCredentialStore::default()), Arc::new(LocaleState::default()));
		let mut request = outgoing();

		decorator.decorate(&mut request);

		assert_eq!(request.headers.get("authorization"), Some("Bearer "));
	}

	#[test]
	fn decorator_overrides_stale_authorization() {
		let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
			"fresh",
			Duration::minutes(5),
		)));
		let decorator = decorator(store, Arc::new(LocaleState::default()));
		let mut request = outgoing();

		request.headers.insert("Authorization", "Bearer stale");
		decorator.decorate(&mut request);

		assert_eq!(request.headers.get("authorization"), Some("Bearer fresh"));
	}
}
