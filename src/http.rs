//! Transport primitives shared by the client pipeline.
//!
//! The module exposes [`ApiTransport`] as the client's only dependency on an HTTP stack,
//! together with the request/response models that flow through the pipeline. Transports
//! report every received response (any status) as `Ok`; the client decides which statuses
//! count as failures. Failures that never produced a response are reported as
//! [`RawFailure`] values and later normalized into [`ApiError`].

pub mod cancel;
pub mod failure;
#[cfg(feature = "reqwest")] pub mod transport;

pub use cancel::*;
pub use failure::*;
#[cfg(feature = "reqwest")] pub use transport::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, RawFailure>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing API calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// client and its refresh coordinator. A long-lived refresh credential (for example an httpOnly
/// cookie) is the transport's concern; the client never reads or writes it.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches a fully decorated request.
	fn send(&self, request: OutgoingRequest) -> TransportFuture<'_>;
}
impl<T> ApiTransport for Arc<T>
where
	T: ?Sized + ApiTransport,
{
	fn send(&self, request: OutgoingRequest) -> TransportFuture<'_> {
		(**self).send(request)
	}
}

/// Rejects header names that are not HTTP tokens and values carrying control characters.
pub fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
	let valid_name = !name.is_empty()
		&& name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
	let valid_value = value.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f));

	if valid_name && valid_value {
		Ok(())
	} else {
		Err(ConfigError::InvalidHeader { name: name.to_owned() })
	}
}

/// HTTP methods used by the console API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the wire representation.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Header collection with case-insensitive names.
///
/// Names are stored lowercased; lookups lowercase their argument.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBag(BTreeMap<String, String>);
impl HeaderBag {
	/// Creates an empty bag.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces a header.
	pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
		self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
	}

	/// Appends a value to an existing header, joining with `", "`.
	pub fn append(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
		let entry = self.0.entry(name.as_ref().to_ascii_lowercase()).or_default();

		if !entry.is_empty() {
			entry.push_str(", ");
		}

		entry.push_str(value.as_ref());
	}

	/// Returns the header value, if present.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Removes a header, returning its value.
	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.0.remove(&name.to_ascii_lowercase())
	}

	/// Returns `true` if the header is present.
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(&name.to_ascii_lowercase())
	}

	/// Copies every header from `defaults` that is not already set.
	pub fn merge_missing(&mut self, defaults: &HeaderBag) {
		for (name, value) in defaults.iter() {
			self.0.entry(name.to_owned()).or_insert_with(|| value.to_owned());
		}
	}

	/// Iterates over `(name, value)` pairs in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
	}

	/// Number of headers.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` if no headers are set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl<K, V> FromIterator<(K, V)> for HeaderBag
where
	K: AsRef<str>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut bag = Self::new();

		for (name, value) in iter {
			bag.insert(name, value);
		}

		bag
	}
}

/// Application-level request description.
///
/// `path` is resolved against the descriptor's base URL at dispatch time; absolute URLs are
/// accepted as-is. `already_retried` is the replay marker: once set, an expired-credential
/// failure of this call is surfaced instead of starting another refresh.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL, or an absolute URL.
	pub path: String,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Per-request headers; these win over client defaults.
	pub headers: HeaderBag,
	/// Optional JSON body.
	pub body: Option<Value>,
	/// Per-request timeout; falls back to the descriptor default.
	pub timeout: Option<StdDuration>,
	/// Caller-owned cancellation handle.
	pub cancel: Option<CancelToken>,
	/// Set once this call drove or waited on a refresh episode.
	pub already_retried: bool,
	/// Opts the call out of refresh recovery entirely.
	pub skip_auth_refresh: bool,
}
impl ApiRequest {
	/// Creates a request for the provided method and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderBag::new(),
			body: None,
			timeout: None,
			cancel: None,
			already_retried: false,
			skip_auth_refresh: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Appends a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Sets a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Overrides the timeout for this call.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Attaches a cancellation handle.
	pub fn with_cancel(mut self, token: CancelToken) -> Self {
		self.cancel = Some(token);

		self
	}

	/// Opts this call out of refresh recovery.
	pub fn skip_auth_refresh(mut self) -> Self {
		self.skip_auth_refresh = true;

		self
	}

	/// Returns `true` if the caller canceled this call.
	pub fn is_canceled(&self) -> bool {
		self.cancel.as_ref().is_some_and(CancelToken::is_canceled)
	}

	/// Captures the identifying metadata of this call.
	pub fn snapshot(&self) -> RequestSnapshot {
		RequestSnapshot { method: self.method, url: self.path.clone() }
	}
}

/// Request handed to an [`ApiTransport`] after URL resolution and decoration.
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
	/// HTTP method.
	pub method: Method,
	/// Fully resolved URL including query parameters.
	pub url: Url,
	/// Final header set.
	pub headers: HeaderBag,
	/// Optional JSON body.
	pub body: Option<Value>,
	/// Effective timeout.
	pub timeout: Option<StdDuration>,
}
impl OutgoingRequest {
	/// Captures the identifying metadata of this request.
	pub fn snapshot(&self) -> RequestSnapshot {
		RequestSnapshot { method: self.method, url: self.url.to_string() }
	}
}

/// Response received from the server, whatever its status.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderBag,
	/// Decoded body: JSON when parseable, a string otherwise, `null` when empty.
	pub body: Value,
}
impl ApiResponse {
	/// Creates a response with no headers.
	pub fn new(status: u16, body: Value) -> Self {
		Self { status, headers: HeaderBag::new(), body }
	}

	/// Adds a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Decodes a raw response body into the JSON value stored on [`ApiResponse`].
pub fn decode_body(bytes: &[u8]) -> Value {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Value::Null;
	}

	serde_json::from_slice(bytes)
		.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
