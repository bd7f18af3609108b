//! reqwest-backed [`ApiTransport`].

// crates.io
use reqwest::{Method as ReqwestMethod, header::HeaderMap, redirect::Policy};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{
		ApiResponse, ApiTransport, HeaderBag, Method, OutgoingRequest, RawFailure,
		RequestSnapshot, TransportFailure, TransportFuture, codes, decode_body,
	},
};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The default client keeps a cookie store so the long-lived refresh credential set by the
/// server (typically an httpOnly cookie) rides along with the refresh call without the client
/// ever reading it, and does not follow redirects so auth failures surface as-is.
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Builds the default transport.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().cookie_store(true).redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: OutgoingRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let snapshot = request.snapshot();
			let mut builder = client.request(reqwest_method(request.method), request.url);

			for (name, value) in request.headers.iter() {
				builder = builder.header(name, value);
			}
			if let Some(body) = &request.body {
				builder = builder.json(body);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response =
				builder.send().await.map_err(|err| map_reqwest_error(snapshot.clone(), err))?;
			let status = response.status().as_u16();
			let headers = collect_headers(response.headers());
			let bytes = response.bytes().await.map_err(|err| map_reqwest_error(snapshot, err))?;

			Ok(ApiResponse { status, headers, body: decode_body(&bytes) })
		})
	}
}

fn reqwest_method(method: Method) -> ReqwestMethod {
	match method {
		Method::Get => ReqwestMethod::GET,
		Method::Post => ReqwestMethod::POST,
		Method::Put => ReqwestMethod::PUT,
		Method::Patch => ReqwestMethod::PATCH,
		Method::Delete => ReqwestMethod::DELETE,
	}
}

fn collect_headers(headers: &HeaderMap) -> HeaderBag {
	let mut bag = HeaderBag::new();

	for (name, value) in headers {
		if let Ok(value) = value.to_str() {
			bag.append(name.as_str(), value);
		}
	}

	bag
}

fn map_reqwest_error(request: RequestSnapshot, err: ReqwestError) -> RawFailure {
	if err.is_builder() {
		return RawFailure::other(err);
	}
	if err.is_timeout() {
		return TransportFailure::timeout(request, err.to_string()).into();
	}

	let code = if err.is_connect() { "ECONNREFUSED" } else { codes::NETWORK };

	TransportFailure::network(request, code, err.to_string()).into()
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::{HeaderName, HeaderValue};
	// self
	use super::*;

	#[test]
	fn builds_default_transport() {
		assert!(ReqwestTransport::new().is_ok());
	}

	#[test]
	fn collects_repeated_headers() {
		let mut headers = HeaderMap::new();

		headers.append(HeaderName::from_static("x-request-id"), HeaderValue::from_static("r-1"));
		headers.append(HeaderName::from_static("vary"), HeaderValue::from_static("origin"));
		headers.append(HeaderName::from_static("vary"), HeaderValue::from_static("accept"));

		let bag = collect_headers(&headers);

		assert_eq!(bag.get("X-Request-Id"), Some("r-1"));
		assert_eq!(bag.get("vary"), Some("origin, accept"));
	}

	#[test]
	fn method_mapping_is_exhaustive() {
		assert_eq!(reqwest_method(Method::Get), ReqwestMethod::GET);
		assert_eq!(reqwest_method(Method::Patch), ReqwestMethod::PATCH);
		assert_eq!(reqwest_method(Method::Delete), ReqwestMethod::DELETE);
	}
}
