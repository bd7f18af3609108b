//! Error normalization: every raw failure becomes exactly one [`ApiError`].
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. cancellations (explicit or recognized by transport code/message),
//! 2. failures raised outside the transport,
//! 3. transport failures without a response (timeout vs. network),
//! 4. received responses, with body/header extraction and status-specific fallbacks.
//!
//! Normalization is a pure function of the failure and the configured messages.

// self
use crate::{
	_prelude::*,
	descriptor,
	error::{ErrorKind, RawSnapshot},
	http::{RawFailure, RequestSnapshot, TransportFailure, codes},
};

/// User-facing messages emitted by the normalizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessages {
	/// Request canceled by the caller.
	pub canceled: String,
	/// Anything without a more specific message.
	pub fallback: String,
	/// No response because the connection failed.
	pub network: String,
	/// No response because the call timed out.
	pub timeout: String,
	/// 401 from a login endpoint.
	pub invalid_credentials: String,
	/// 401 from any other endpoint.
	pub session_expired: String,
	/// 403.
	pub forbidden: String,
	/// 404.
	pub not_found: String,
	/// 429.
	pub rate_limited: String,
	/// 5xx.
	pub server_error: String,
	/// 400 and 422.
	pub validation: String,
}
impl Default for ErrorMessages {
	fn default() -> Self {
		Self {
			canceled: "Request canceled.".into(),
			fallback: "Something went wrong. Please try again.".into(),
			network: "Network error. Please check your connection and try again.".into(),
			timeout: "The request timed out. Please try again.".into(),
			invalid_credentials: "Invalid email or password.".into(),
			session_expired: "Your session has expired. Please sign in again.".into(),
			forbidden: "You do not have permission to perform this action.".into(),
			not_found: "The requested resource was not found.".into(),
			rate_limited: "Too many requests. Please wait a moment and try again.".into(),
			server_error: "Server error. Please try again later.".into(),
			validation: "Some fields are invalid. Please review your input.".into(),
		}
	}
}

/// Maps raw failures into the canonical [`ApiError`] shape.
#[derive(Clone, Debug)]
pub struct ErrorNormalizer {
	messages: ErrorMessages,
	login_paths: Vec<String>,
}
impl ErrorNormalizer {
	const REQUEST_ID_HEADERS: [&'static str; 2] = ["x-request-id", "x-correlation-id"];

	/// Creates a normalizer using the provided messages and login endpoint paths.
	pub fn new(messages: ErrorMessages, login_paths: Vec<String>) -> Self {
		Self { messages, login_paths }
	}

	/// Returns the configured messages.
	pub fn messages(&self) -> &ErrorMessages {
		&self.messages
	}

	/// Produces exactly one canonical error for the failure.
	pub fn normalize(&self, failure: &RawFailure) -> ApiError {
		if failure.is_canceled() {
			return self.canceled(failure);
		}

		match failure {
			RawFailure::Other(err) => self.non_transport(err.as_ref()),
			RawFailure::Transport(failure) => match &failure.response {
				None => self.no_response(failure),
				Some(_) => self.with_response(failure),
			},
			RawFailure::Canceled(_) => self.canceled(failure),
		}
	}

	fn canceled(&self, failure: &RawFailure) -> ApiError {
		let raw = match failure {
			RawFailure::Canceled(request) => RawSnapshot {
				name: "CanceledError".into(),
				message: self.messages.canceled.clone(),
				code: Some(codes::CANCELED.into()),
				..request_snapshot(request)
			},
			RawFailure::Transport(failure) => transport_snapshot(failure),
			RawFailure::Other(err) => other_snapshot(err.as_ref()),
		};
		let mut err = ApiError::new(ErrorKind::Canceled, &self.messages.canceled);

		err.code = Some(codes::CANCELED.into());
		err.is_canceled = true;
		err.raw = Some(raw);

		err
	}

	fn non_transport(&self, source: &(dyn StdError + Send + Sync)) -> ApiError {
		let message = source.to_string();
		let message =
			if message.trim().is_empty() { self.messages.fallback.clone() } else { message };
		let mut err = ApiError::new(ErrorKind::Unknown, message);

		err.raw = Some(other_snapshot(source));

		err
	}

	fn no_response(&self, failure: &TransportFailure) -> ApiError {
		let message =
			if is_timeout(failure) { &self.messages.timeout } else { &self.messages.network };
		let mut err = ApiError::new(ErrorKind::NetworkOrTimeout, message);

		err.code = failure.code.clone();
		err.raw = Some(transport_snapshot(failure));

		err
	}

	fn with_response(&self, failure: &TransportFailure) -> ApiError {
		let Some(response) = failure.response.as_ref() else {
			return self.no_response(failure);
		};
		let status = response.status;
		let body = &response.body;
		let message = body
			.get("message")
			.and_then(Value::as_str)
			.filter(|message| !message.trim().is_empty())
			.map(str::to_owned)
			.unwrap_or_else(|| self.status_message(status, &failure.request.url).to_owned());
		let mut err = ApiError::new(ErrorKind::from_status(status), message);

		err.status = Some(status);
		err.code = body
			.get("code")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.or_else(|| failure.code.clone());
		err.details = extract_details(body);
		err.request_id = Self::REQUEST_ID_HEADERS
			.iter()
			.find_map(|name| response.headers.get(name))
			.map(str::to_owned);
		err.retry_after = response.headers.get("retry-after").map(str::to_owned);
		err.raw = Some(transport_snapshot(failure));

		err
	}

	fn status_message(&self, status: u16, url: &str) -> &str {
		match status {
			401 if self.is_login(url) => &self.messages.invalid_credentials,
			401 => &self.messages.session_expired,
			403 => &self.messages.forbidden,
			404 => &self.messages.not_found,
			429 => &self.messages.rate_limited,
			400 | 422 => &self.messages.validation,
			code if code >= 500 => &self.messages.server_error,
			_ => &self.messages.fallback,
		}
	}

	fn is_login(&self, url: &str) -> bool {
		self.login_paths.iter().any(|login| descriptor::matches_endpoint(url, login))
	}
}

fn is_timeout(failure: &TransportFailure) -> bool {
	matches!(failure.code.as_deref(), Some(codes::TIMED_OUT | codes::CONNECTION_ABORTED))
		|| failure.message.to_ascii_lowercase().contains("timeout")
		|| failure.message.to_ascii_lowercase().contains("timed out")
}

fn extract_details(body: &Value) -> Option<Vec<String>> {
	let details = body.get("details").or_else(|| body.get("errors"))?;

	match details {
		Value::Array(items) => {
			let lines = items.iter().map(Value::as_str).collect::<Option<Vec<_>>>()?;

			Some(lines.into_iter().map(str::to_owned).collect())
		},
		Value::Object(fields) => {
			let mut lines = Vec::new();

			for (field, value) in fields {
				match value {
					Value::String(message) => lines.push(format!("{field}: {message}")),
					Value::Array(messages) =>
						for message in messages.iter().filter_map(Value::as_str) {
							lines.push(format!("{field}: {message}"));
						},
					_ => {},
				}
			}

			if lines.is_empty() { None } else { Some(lines) }
		},
		_ => None,
	}
}

fn request_snapshot(request: &RequestSnapshot) -> RawSnapshot {
	RawSnapshot {
		url: Some(request.url.clone()),
		method: Some(request.method.as_str().to_owned()),
		..RawSnapshot::default()
	}
}

fn transport_snapshot(failure: &TransportFailure) -> RawSnapshot {
	RawSnapshot {
		name: failure.name.clone(),
		message: failure.message.clone(),
		code: failure.code.clone(),
		status: failure.status_code(),
		..request_snapshot(&failure.request)
	}
}

fn other_snapshot(source: &(dyn StdError + Send + Sync)) -> RawSnapshot {
	RawSnapshot { name: "Error".into(), message: source.to_string(), ..RawSnapshot::default() }
}
