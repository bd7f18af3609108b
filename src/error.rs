//! Canonical API error shape plus the crate-level configuration/storage errors.

// self
use crate::{_prelude::*, descriptor::ApiDescriptorError, store::StoreError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Setup-time error raised while constructing clients and stores.
///
/// Request-time failures never use this type; they are surfaced as [`ApiError`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] ApiDescriptorError),
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A request path could not be resolved against the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidRequestUrl {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header name or value cannot be sent over the wire.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures produced by the refresh episode itself rather than by the transport.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint answered successfully but carried no usable access token.
	#[error("Refresh response did not contain an access token.")]
	MissingAccessToken,
	/// The future driving the refresh episode was dropped before the refresh settled.
	#[error("Token refresh was abandoned before it completed.")]
	Abandoned,
}

/// Failure classes recognized by the client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// The caller canceled the request.
	Canceled,
	/// No response was received (connection failure or timeout).
	NetworkOrTimeout,
	/// HTTP 401.
	CredentialExpired,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// HTTP 429.
	RateLimited,
	/// HTTP 400 or 422.
	Validation,
	/// HTTP 5xx.
	ServerError,
	#[default]
	/// Anything else, including failures raised outside the transport.
	Unknown,
}
impl ErrorKind {
	/// Classifies an HTTP status code.
	pub const fn from_status(status: u16) -> Self {
		match status {
			401 => Self::CredentialExpired,
			403 => Self::Forbidden,
			404 => Self::NotFound,
			429 => Self::RateLimited,
			400 | 422 => Self::Validation,
			code if code >= 500 => Self::ServerError,
			_ => Self::Unknown,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Canceled => "canceled",
			Self::NetworkOrTimeout => "network_or_timeout",
			Self::CredentialExpired => "credential_expired",
			Self::Forbidden => "forbidden",
			Self::NotFound => "not_found",
			Self::RateLimited => "rate_limited",
			Self::Validation => "validation",
			Self::ServerError => "server_error",
			Self::Unknown => "unknown",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Sanitized description of the failure that produced an [`ApiError`].
///
/// Only identifying metadata is kept; bodies, headers, and credentials never land here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
	/// Failure name reported by the producing layer.
	pub name: String,
	/// Failure message reported by the producing layer.
	pub message: String,
	/// Transport error code, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	/// HTTP status, when a response was received.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
	/// Attempted request URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// Attempted request method.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
}

/// Canonical error consumed by every caller of the client.
///
/// `message` is always non-empty and ready to display; `status` is present if and only if a
/// response was received. Build values through [`crate::normalize::ErrorNormalizer`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ApiError {
	/// User-facing message.
	pub message: String,
	/// HTTP status code of the received response.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
	/// Machine-readable error code.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	/// Ordered detail lines (for example, per-field validation messages).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<Vec<String>>,
	/// Correlation identifier echoed by the server.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_id: Option<String>,
	/// Verbatim `retry-after` header value.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<String>,
	/// Set when the caller canceled the request.
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub is_canceled: bool,
	/// Sanitized snapshot of the original failure.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub raw: Option<RawSnapshot>,
	/// Failure class assigned during normalization.
	#[serde(skip)]
	pub kind: ErrorKind,
}
impl ApiError {
	/// Creates an error carrying only a message and a class.
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			status: None,
			code: None,
			details: None,
			request_id: None,
			retry_after: None,
			is_canceled: false,
			raw: None,
			kind,
		}
	}

	/// Returns the failure class.
	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	/// Returns `true` when the session could not be recovered and the user must sign in again.
	pub fn is_session_expired(&self) -> bool {
		self.kind == ErrorKind::CredentialExpired
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_classification_follows_taxonomy() {
		assert_eq!(ErrorKind::from_status(401), ErrorKind::CredentialExpired);
		assert_eq!(ErrorKind::from_status(403), ErrorKind::Forbidden);
		assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
		assert_eq!(ErrorKind::from_status(429), ErrorKind::RateLimited);
		assert_eq!(ErrorKind::from_status(400), ErrorKind::Validation);
		assert_eq!(ErrorKind::from_status(422), ErrorKind::Validation);
		assert_eq!(ErrorKind::from_status(503), ErrorKind::ServerError);
		assert_eq!(ErrorKind::from_status(409), ErrorKind::Unknown);
	}

	#[test]
	fn api_error_serializes_without_empty_fields() {
		let mut err = ApiError::new(ErrorKind::Validation, "Invalid input.");

		err.status = Some(422);
		err.details = Some(vec!["name: required".into()]);

		let payload = serde_json::to_value(&err).expect("ApiError should serialize to JSON.");

		assert_eq!(
			payload,
			serde_json::json!({
				"message": "Invalid input.",
				"status": 422,
				"details": ["name: required"],
			})
		);
		assert_eq!(err.to_string(), "Invalid input.");
	}

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.to_string().contains("disk full"));

		let source = StdError::source(&err)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
