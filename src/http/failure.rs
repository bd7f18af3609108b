//! Raw failures produced before normalization.

// self
use crate::{
	_prelude::*,
	http::{ApiResponse, Method},
};

/// Transport error codes recognized by the normalizer.
pub mod codes {
	/// The caller canceled the request.
	pub const CANCELED: &str = "ERR_CANCELED";
	/// The connection failed before a response arrived.
	pub const NETWORK: &str = "ERR_NETWORK";
	/// The request exceeded its timeout.
	pub const TIMED_OUT: &str = "ETIMEDOUT";
	/// The connection was aborted, usually by a client-side timeout.
	pub const CONNECTION_ABORTED: &str = "ECONNABORTED";
	/// The server answered with a 4xx status.
	pub const BAD_REQUEST: &str = "ERR_BAD_REQUEST";
	/// The server answered with a 5xx status.
	pub const BAD_RESPONSE: &str = "ERR_BAD_RESPONSE";
}

/// Identifying metadata of the call that failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
	/// HTTP method.
	pub method: Method,
	/// Attempted URL (or path when the URL could not be resolved).
	pub url: String,
}

/// Failure reported by the transport layer.
///
/// `response` is present when the server answered with a non-success status and absent for
/// network failures, timeouts, and cancellations.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("{message}")]
pub struct TransportFailure {
	/// Failure name (for example `HttpError` or `TimeoutError`).
	pub name: String,
	/// Transport message.
	pub message: String,
	/// Transport error code, see [`codes`].
	pub code: Option<String>,
	/// The call that failed.
	pub request: RequestSnapshot,
	/// Received response, if any.
	pub response: Option<ApiResponse>,
}
impl TransportFailure {
	/// Builds a failure for a connection that produced no response.
	pub fn network(
		request: RequestSnapshot,
		code: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			name: "NetworkError".into(),
			message: message.into(),
			code: Some(code.into()),
			request,
			response: None,
		}
	}

	/// Builds a failure for a call that exceeded its timeout.
	pub fn timeout(request: RequestSnapshot, message: impl Into<String>) -> Self {
		Self {
			name: "TimeoutError".into(),
			message: message.into(),
			code: Some(codes::TIMED_OUT.into()),
			request,
			response: None,
		}
	}

	/// Builds a failure for a received non-success response.
	pub fn status(request: RequestSnapshot, response: ApiResponse) -> Self {
		let code = if response.status >= 500 { codes::BAD_RESPONSE } else { codes::BAD_REQUEST };

		Self {
			name: "HttpError".into(),
			message: format!("Request failed with status code {}.", response.status),
			code: Some(code.into()),
			request,
			response: Some(response),
		}
	}

	/// Status of the received response, if any.
	pub fn status_code(&self) -> Option<u16> {
		self.response.as_ref().map(|response| response.status)
	}

	fn looks_canceled(&self) -> bool {
		if self.code.as_deref() == Some(codes::CANCELED) {
			return true;
		}
		if matches!(self.name.as_str(), "CanceledError" | "AbortError") {
			return true;
		}

		// Peers abort connections too; only an explicit cancel wording counts.
		let lowered = self.message.to_ascii_lowercase();

		lowered.contains("canceled") || lowered.contains("cancelled")
	}
}

/// Any failure a call can produce before normalization.
///
/// Cloning is cheap so a single refresh failure can be handed to every waiter of an episode.
#[derive(Clone, Debug, ThisError)]
pub enum RawFailure {
	/// The caller canceled the call through its [`CancelToken`](crate::http::CancelToken).
	#[error("Request canceled.")]
	Canceled(RequestSnapshot),
	/// The transport reported a failure.
	#[error(transparent)]
	Transport(TransportFailure),
	/// A failure raised outside the transport (construction, decoding, storage).
	#[error("{0}")]
	Other(Arc<dyn StdError + Send + Sync>),
}
impl RawFailure {
	/// Wraps a non-transport error.
	pub fn other(err: impl 'static + Send + Sync + StdError) -> Self {
		Self::Other(Arc::new(err))
	}

	/// Status of the received response, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Transport(failure) => failure.status_code(),
			_ => None,
		}
	}

	/// Returns `true` for explicit cancellations and transport failures that look like one.
	pub fn is_canceled(&self) -> bool {
		match self {
			Self::Canceled(_) => true,
			Self::Transport(failure) => failure.looks_canceled(),
			Self::Other(_) => false,
		}
	}

	/// Returns `true` when the server rejected the call's credential.
	///
	/// Cancellations never qualify, even when the underlying status is 401.
	pub fn is_credential_expired(&self) -> bool {
		!self.is_canceled() && self.status() == Some(401)
	}
}
impl From<TransportFailure> for RawFailure {
	fn from(failure: TransportFailure) -> Self {
		Self::Transport(failure)
	}
}
