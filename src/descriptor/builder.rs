// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, descriptor::ApiDescriptor, normalize::ErrorMessages};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ApiDescriptorError {
	/// The base URL cannot carry relative paths.
	#[error("Base URL cannot be used as a base: {url}.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// The base URL must use HTTPS unless it targets a loopback host.
	#[error("Base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Endpoint paths must be absolute paths.
	#[error("The {endpoint} path must start with `/`: {path}.")]
	InvalidEndpointPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// The authorization scheme must be a single non-empty token.
	#[error("Token type must be a non-empty token without whitespace.")]
	InvalidTokenType,
	/// The locale header name contains characters not allowed in header names.
	#[error("Header name `{name}` is invalid.")]
	InvalidHeaderName {
		/// Offending header name.
		name: String,
	},
	/// The access token pointer must be a JSON pointer.
	#[error("Access token pointer must start with `/`: {pointer}.")]
	InvalidTokenPointer {
		/// Offending pointer.
		pointer: String,
	},
	/// Credential lifetime must be positive.
	#[error("Credential TTL must be positive.")]
	NonPositiveTtl,
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug)]
pub struct ApiDescriptorBuilder {
	/// Base URL for the descriptor being constructed.
	pub base_url: Url,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Login endpoint paths.
	pub login_paths: Vec<String>,
	/// Authorization scheme prefix.
	pub token_type: String,
	/// Locale header name.
	pub locale_header: String,
	/// JSON pointer to the access credential in refresh responses.
	pub access_token_pointer: String,
	/// Lifetime for freshly written credentials.
	pub credential_ttl: Duration,
	/// Default per-call timeout.
	pub request_timeout: StdDuration,
	/// User-facing messages.
	pub messages: ErrorMessages,
}
impl ApiDescriptorBuilder {
	/// Creates a new builder seeded with defaults for everything but the base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: ApiDescriptor::DEFAULT_REFRESH_PATH.into(),
			login_paths: vec![ApiDescriptor::DEFAULT_LOGIN_PATH.into()],
			token_type: ApiDescriptor::DEFAULT_TOKEN_TYPE.into(),
			locale_header: ApiDescriptor::DEFAULT_LOCALE_HEADER.into(),
			access_token_pointer: ApiDescriptor::DEFAULT_ACCESS_TOKEN_POINTER.into(),
			credential_ttl: ApiDescriptor::DEFAULT_CREDENTIAL_TTL,
			request_timeout: ApiDescriptor::DEFAULT_REQUEST_TIMEOUT,
			messages: ErrorMessages::default(),
		}
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Replaces the login endpoint paths.
	pub fn login_paths<I, S>(mut self, paths: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.login_paths = paths.into_iter().map(Into::into).collect();

		self
	}

	/// Sets the authorization scheme prefix.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = token_type.into();

		self
	}

	/// Sets the locale header name.
	pub fn locale_header(mut self, header: impl Into<String>) -> Self {
		self.locale_header = header.into();

		self
	}

	/// Sets the JSON pointer locating the access credential in refresh responses.
	pub fn access_token_pointer(mut self, pointer: impl Into<String>) -> Self {
		self.access_token_pointer = pointer.into();

		self
	}

	/// Sets the lifetime assigned to freshly written credentials.
	pub fn credential_ttl(mut self, ttl: Duration) -> Self {
		self.credential_ttl = ttl;

		self
	}

	/// Sets the default per-call timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the user-facing messages.
	pub fn messages(mut self, messages: ErrorMessages) -> Self {
		self.messages = messages;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let descriptor = ApiDescriptor {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			login_paths: self.login_paths,
			token_type: self.token_type,
			locale_header: self.locale_header,
			access_token_pointer: self.access_token_pointer,
			credential_ttl: self.credential_ttl,
			request_timeout: self.request_timeout,
			messages: self.messages,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ApiDescriptor {
	/// Validates invariants for the descriptor.
	///
	/// Builders call this automatically; call it yourself after deserializing a descriptor.
	pub fn validate(&self) -> Result<(), ApiDescriptorError> {
		validate_base_url(&self.base_url)?;
		validate_path("refresh", &self.refresh_path)?;

		for login in &self.login_paths {
			validate_path("login", login)?;
		}

		if self.token_type.is_empty() || self.token_type.chars().any(char::is_whitespace) {
			return Err(ApiDescriptorError::InvalidTokenType);
		}
		if !is_header_name(&self.locale_header) {
			return Err(ApiDescriptorError::InvalidHeaderName { name: self.locale_header.clone() });
		}
		if !self.access_token_pointer.starts_with('/') {
			return Err(ApiDescriptorError::InvalidTokenPointer {
				pointer: self.access_token_pointer.clone(),
			});
		}
		if !self.credential_ttl.is_positive() {
			return Err(ApiDescriptorError::NonPositiveTtl);
		}

		Ok(())
	}
}

fn validate_base_url(url: &Url) -> Result<(), ApiDescriptorError> {
	if url.cannot_be_a_base() {
		return Err(ApiDescriptorError::InvalidBaseUrl { url: url.to_string() });
	}

	let loopback = match url.host() {
		Some(url::Host::Domain(domain)) => domain == "localhost",
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	};

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(ApiDescriptorError::InsecureBaseUrl { url: url.to_string() }),
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ApiDescriptorError> {
	if path.len() > 1 && path.starts_with('/') {
		Ok(())
	} else {
		Err(ApiDescriptorError::InvalidEndpointPath { endpoint, path: path.to_owned() })
	}
}

fn is_header_name(name: &str) -> bool {
	!name.is_empty()
		&& name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
