//! Transport contract
//!
//! Components fetch remote data through a [`Transport`]. The runtime ships
//! no network implementation; applications provide one and tests use the
//! mock from `hookloop-testkit`.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::promise::{Promise, Rejection};

/// Promise-based HTTP `GET`
///
/// Implementations must settle the returned promise from a task on the
/// event loop, never by blocking the caller. Only 2xx responses fulfill;
/// any other status rejects with [`RejectionKind::Status`](crate::RejectionKind::Status),
/// and connection failures reject with `Network`.
pub trait Transport {
	fn get(&self, url: &str) -> Promise<Response>;
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
	fn get(&self, url: &str) -> Promise<Response> {
		(**self).get(url)
	}
}

impl<T: Transport + ?Sized> Transport for &T {
	fn get(&self, url: &str) -> Promise<Response> {
		(**self).get(url)
	}
}

/// A decoded response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	pub data: serde_json::Value,
	pub status: u16,
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
}

impl Response {
	pub fn new(status: u16, data: serde_json::Value) -> Self {
		Self {
			data,
			status,
			headers: BTreeMap::new(),
		}
	}

	/// `200 OK` carrying `data`
	pub fn ok(data: serde_json::Value) -> Self {
		Self::new(200, data)
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers
			.insert(name.into().to_ascii_lowercase(), value.into());
		self
	}

	/// Case-insensitive header lookup
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.get(&name.to_ascii_lowercase())
			.map(String::as_str)
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Deserialise the payload
	///
	/// # Errors
	///
	/// A [`RejectionKind::MalformedPayload`](crate::RejectionKind::MalformedPayload)
	/// rejection when the payload does not match `T`.
	pub fn json<T: DeserializeOwned>(&self) -> Result<T, Rejection> {
		T::deserialize(&self.data).map_err(|e| Rejection::malformed(e.to_string()))
	}

	/// Turn a non-success status into a `Status` rejection
	pub fn error_for_status(self) -> Result<Self, Rejection> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(Rejection::status(
				self.status,
				format!("request failed with status {}", self.status),
			))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::RejectionKind;
	use rstest::rstest;
	use serde_json::json;

	#[derive(Debug, PartialEq, Deserialize)]
	struct Item {
		id: u32,
	}

	#[rstest]
	fn test_json_decodes_payload() {
		let response = Response::ok(json!([{ "id": 1 }, { "id": 2 }]));

		let items: Vec<Item> = response.json().unwrap();

		assert_eq!(items, vec![Item { id: 1 }, Item { id: 2 }]);
	}

	#[rstest]
	fn test_json_mismatch_is_malformed() {
		let response = Response::ok(json!({ "id": "one" }));

		let err = response.json::<Item>().unwrap_err();

		assert_eq!(err.kind, RejectionKind::MalformedPayload);
	}

	#[rstest]
	#[case(200, true)]
	#[case(204, true)]
	#[case(301, false)]
	#[case(404, false)]
	#[case(500, false)]
	fn test_status_classification(#[case] status: u16, #[case] success: bool) {
		let response = Response::new(status, serde_json::Value::Null);

		assert_eq!(response.is_success(), success);
		assert_eq!(response.error_for_status().is_ok(), success);
	}

	#[rstest]
	fn test_header_lookup_ignores_case() {
		let response = Response::ok(json!(null)).with_header("Content-Type", "application/json");

		assert_eq!(response.header("content-type"), Some("application/json"));
		assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
	}
}
