//! Response unwrapping: strip the transport envelope and hand back the payload.

// self
use crate::{_prelude::*, http::ApiResponse};

/// Failure decoding an unwrapped payload into a domain type.
#[derive(Debug, ThisError)]
#[error("Response payload could not be decoded at `{path}`: {source}")]
pub struct PayloadError {
	/// JSON path of the offending field.
	pub path: String,
	/// Underlying decoding failure.
	#[source]
	pub source: serde_json::Error,
}

/// Returns only the domain payload, discarding status and headers.
pub fn unwrap_payload(response: ApiResponse) -> Value {
	response.body
}

/// Decodes an unwrapped payload into `T`, reporting the failing path.
pub fn decode_payload<T>(payload: Value) -> Result<T, PayloadError>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(payload).map_err(|err| PayloadError {
		path: err.path().to_string(),
		source: err.into_inner(),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, Deserialize, PartialEq)]
	struct Brand {
		id: u64,
		name: String,
	}

	#[test]
	fn unwrap_discards_envelope() {
		let response = ApiResponse::new(200, serde_json::json!({ "id": 1, "name": "Acme" }))
			.with_header("x-request-id", "abc");

		assert_eq!(unwrap_payload(response), serde_json::json!({ "id": 1, "name": "Acme" }));
	}

	#[test]
	fn decode_reports_failing_path() {
		let brands: Vec<Brand> =
			decode_payload(serde_json::json!([{ "id": 1, "name": "Acme" }]))
				.expect("Valid payload should decode.");

		assert_eq!(brands, vec![Brand { id: 1, name: "Acme".into() }]);

		let err = decode_payload::<Vec<Brand>>(serde_json::json!([{ "id": "x", "name": "Acme" }]))
			.expect_err("Mistyped payload should fail to decode.");

		assert_eq!(err.path, "[0].id");
		assert!(err.to_string().contains("[0].id"));
	}
}
