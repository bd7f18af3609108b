//! API descriptor: validated client configuration shared by every pipeline stage.
//!
//! The descriptor names the base URL, the auth endpoints the refresh coordinator must treat
//! specially, how the bearer header is composed, where the refresh response carries the new
//! credential, and the user-facing messages used by the normalizer.

/// Builder API for assembling descriptors.
pub mod builder;

pub use builder::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::ConfigError, normalize::ErrorMessages};

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// Base URL every relative request path is resolved against.
	pub base_url: Url,
	/// Path of the refresh endpoint, relative to the base URL.
	pub refresh_path: String,
	/// Paths whose 401 responses mean "invalid credentials" rather than "session expired".
	pub login_paths: Vec<String>,
	/// Authorization scheme prefix (for example `Bearer`).
	pub token_type: String,
	/// Header carrying the active locale.
	pub locale_header: String,
	/// JSON pointer locating the new access credential in the refresh response.
	pub access_token_pointer: String,
	/// Lifetime assigned to freshly written credentials.
	pub credential_ttl: Duration,
	/// Timeout applied to calls that do not set their own.
	pub request_timeout: StdDuration,
	/// User-facing messages emitted by the normalizer.
	pub messages: ErrorMessages,
}
impl ApiDescriptor {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default login endpoint path.
	pub const DEFAULT_LOGIN_PATH: &'static str = "/auth/login";
	/// Default authorization scheme.
	pub const DEFAULT_TOKEN_TYPE: &'static str = "Bearer";
	/// Default locale header.
	pub const DEFAULT_LOCALE_HEADER: &'static str = "Accept-Language";
	/// Default pointer to the access credential in refresh responses.
	pub const DEFAULT_ACCESS_TOKEN_POINTER: &'static str = "/accessToken";
	/// Default credential lifetime.
	pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::minutes(15);
	/// Default per-call timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new(base_url)
	}

	/// Resolves a request path (or absolute URL) plus query parameters into a full URL.
	pub fn resolve(&self, path: &str, query: &[(String, String)]) -> Result<Url, ConfigError> {
		let invalid = |source| ConfigError::InvalidRequestUrl { path: path.to_owned(), source };
		let mut url = if path.starts_with("https://") || path.starts_with("http://") {
			Url::parse(path).map_err(invalid)?
		} else {
			let base_path = self.base_url.path().trim_end_matches('/');
			let relative = path.trim_start_matches('/');

			self.base_url.join(&format!("{base_path}/{relative}")).map_err(invalid)?
		};

		if !query.is_empty() {
			let mut pairs = url.query_pairs_mut();

			for (name, value) in query {
				pairs.append_pair(name, value);
			}
		}

		Ok(url)
	}

	/// Full URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.refresh_path, &[])
	}

	/// Returns `true` if the URL or path targets the refresh endpoint.
	pub fn is_refresh_endpoint(&self, url: &str) -> bool {
		matches_endpoint(url, &self.refresh_path)
	}

	/// Returns `true` if the URL or path targets a login endpoint.
	pub fn is_login_endpoint(&self, url: &str) -> bool {
		self.login_paths.iter().any(|login| matches_endpoint(url, login))
	}

	/// Returns `true` if the URL or path targets an endpoint that must never trigger a refresh.
	pub fn is_auth_endpoint(&self, url: &str) -> bool {
		self.is_refresh_endpoint(url) || self.is_login_endpoint(url)
	}
}

/// Compares the path component of `url` (absolute URL or bare path) against `endpoint`.
pub fn matches_endpoint(url: &str, endpoint: &str) -> bool {
	let path = match Url::parse(url) {
		Ok(parsed) => parsed.path().to_owned(),
		Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_owned(),
	};
	let endpoint = endpoint.trim_matches('/');

	if endpoint.is_empty() {
		return false;
	}

	// Relative paths may omit the leading slash; compare whole segments only.
	format!("/{}", path.trim_matches('/')).ends_with(&format!("/{endpoint}"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn descriptor(base: &str) -> ApiDescriptor {
		ApiDescriptor::builder(Url::parse(base).expect("Fixture base URL should parse."))
			.build()
			.expect("Fixture descriptor should build.")
	}

	#[test]
	fn resolve_keeps_base_path_prefix() {
		let descriptor = descriptor("https://api.example.com/api/v1/");
		let url = descriptor
			.resolve("/brands", &[("page".into(), "2".into()), ("q".into(), "a b".into())])
			.expect("Relative path should resolve.");

		assert_eq!(url.as_str(), "https://api.example.com/api/v1/brands?page=2&q=a+b");

		let url = descriptor.resolve("sellers/7", &[]).expect("Relative path should resolve.");

		assert_eq!(url.as_str(), "https://api.example.com/api/v1/sellers/7");
	}

	#[test]
	fn resolve_accepts_absolute_urls() {
		let descriptor = descriptor("https://api.example.com/");
		let url = descriptor
			.resolve("https://files.example.com/upload", &[])
			.expect("Absolute URL should resolve.");

		assert_eq!(url.as_str(), "https://files.example.com/upload");
	}

	#[test]
	fn endpoint_matching_ignores_query_and_trailing_slash() {
		let descriptor = descriptor("https://api.example.com/api");

		assert!(descriptor.is_login_endpoint("https://api.example.com/api/auth/login/"));
		assert!(descriptor.is_login_endpoint("/auth/login?next=%2F"));
		assert!(descriptor.is_refresh_endpoint("https://api.example.com/api/auth/refresh"));
		assert!(!descriptor.is_auth_endpoint("/users"));
		assert!(!descriptor.is_login_endpoint("/oauth/login"));
		assert_eq!(
			descriptor.refresh_url().expect("Refresh URL should resolve.").as_str(),
			"https://api.example.com/api/auth/refresh",
		);
	}

	#[test]
	fn endpoint_matching_accepts_paths_without_leading_slash() {
		let descriptor = descriptor("https://api.example.com/api");

		assert!(descriptor.is_login_endpoint("auth/login"));
		assert!(descriptor.is_refresh_endpoint("auth/refresh/"));
		assert!(!descriptor.is_auth_endpoint("brands/auth"));

		let mut relative = descriptor.clone();

		relative.login_paths = vec!["auth/login".into()];

		assert!(relative.is_login_endpoint("/auth/login"));
		assert!(relative.is_login_endpoint("https://api.example.com/api/auth/login"));
	}
}
