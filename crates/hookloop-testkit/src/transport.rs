//! Mock transport.
//!
//! Routes are matched on the exact URL. Responses and failures are settled
//! from a macrotask after the route's latency, the way a real network
//! transport would settle them, so tests observe the same ordering as
//! production code.
//!
//! # Example
//!
//! ```
//! use hookloop_core::{EventLoop, LoopSettings, Transport};
//! use hookloop_testkit::MockTransport;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::virtual_time(LoopSettings::default());
//! event_loop.start().unwrap();
//!
//! let transport = MockTransport::new(&event_loop.handle());
//! transport.respond_json("/api/items", json!([{ "id": 1 }]));
//!
//! let response = transport.get("/api/items");
//! assert!(response.is_pending());
//!
//! event_loop.advance(Duration::from_millis(10)).unwrap();
//! assert!(!response.is_pending());
//! assert_eq!(transport.request_count("/api/items"), 1);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use hookloop_core::{LoopHandle, Promise, Rejection, Resolver, Response, Transport};
use tracing::trace;

/// Latency applied to routes that do not set their own
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
enum MockRoute {
	Respond {
		response: Response,
		latency: Option<Duration>,
	},
	Fail {
		rejection: Rejection,
		latency: Option<Duration>,
	},
	/// Never settles
	Hang,
}

/// One call to [`MockTransport::get`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
	pub url: String,
	/// Loop time of the call
	pub at: Duration,
}

#[derive(Debug)]
struct MockState {
	routes: HashMap<String, MockRoute>,
	latency: Duration,
	requests: Vec<RecordedRequest>,
	/// Resolvers of hanging requests, kept so they stay pending
	hung: Vec<Resolver<Response>>,
}

/// Scriptable [`Transport`] for tests
///
/// Clones share routes and the request log. Unknown URLs reject with a
/// `404` status rejection.
#[derive(Debug, Clone)]
pub struct MockTransport {
	handle: LoopHandle,
	state: Rc<RefCell<MockState>>,
}

impl MockTransport {
	pub fn new(handle: &LoopHandle) -> Self {
		Self {
			handle: handle.clone(),
			state: Rc::new(RefCell::new(MockState {
				routes: HashMap::new(),
				latency: DEFAULT_LATENCY,
				requests: Vec::new(),
				hung: Vec::new(),
			})),
		}
	}

	/// Set the latency for routes without their own
	pub fn with_latency(self, latency: Duration) -> Self {
		self.state.borrow_mut().latency = latency;
		self
	}

	/// Answer `url` with `response`
	///
	/// A non-2xx status rejects with a `Status` rejection.
	pub fn respond(&self, url: &str, response: Response) -> &Self {
		self.route(
			url,
			MockRoute::Respond {
				response,
				latency: None,
			},
		)
	}

	/// Answer `url` with `200 OK` and a JSON payload
	pub fn respond_json(&self, url: &str, data: serde_json::Value) -> &Self {
		self.respond(url, Response::ok(data))
	}

	/// Answer `url` with `response` after `latency`
	pub fn respond_after(&self, url: &str, response: Response, latency: Duration) -> &Self {
		self.route(
			url,
			MockRoute::Respond {
				response,
				latency: Some(latency),
			},
		)
	}

	/// Reject requests to `url`
	pub fn fail(&self, url: &str, rejection: Rejection) -> &Self {
		self.route(
			url,
			MockRoute::Fail {
				rejection,
				latency: None,
			},
		)
	}

	/// Leave requests to `url` pending forever
	pub fn hang(&self, url: &str) -> &Self {
		self.route(url, MockRoute::Hang)
	}

	fn route(&self, url: &str, route: MockRoute) -> &Self {
		self.state.borrow_mut().routes.insert(url.to_string(), route);
		self
	}

	/// Every request so far, in call order
	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.state.borrow().requests.clone()
	}

	pub fn request_count(&self, url: &str) -> usize {
		self.state
			.borrow()
			.requests
			.iter()
			.filter(|request| request.url == url)
			.count()
	}

	/// Requests that will never settle
	pub fn hanging(&self) -> usize {
		self.state.borrow().hung.len()
	}

	pub fn clear_requests(&self) {
		self.state.borrow_mut().requests.clear();
	}
}

impl Transport for MockTransport {
	fn get(&self, url: &str) -> Promise<Response> {
		let (promise, resolver) = Promise::pending(&self.handle);
		let (route, default_latency) = {
			let mut state = self.state.borrow_mut();
			state.requests.push(RecordedRequest {
				url: url.to_string(),
				at: self.handle.now(),
			});
			(state.routes.get(url).cloned(), state.latency)
		};
		trace!(url, "mock request");

		match route {
			Some(MockRoute::Respond { response, latency }) => {
				self.handle
					.schedule_after(latency.unwrap_or(default_latency), move || {
						resolver.settle(response.error_for_status());
					});
			}
			Some(MockRoute::Fail { rejection, latency }) => {
				self.handle
					.schedule_after(latency.unwrap_or(default_latency), move || {
						resolver.reject(rejection);
					});
			}
			Some(MockRoute::Hang) => self.state.borrow_mut().hung.push(resolver),
			None => {
				let rejection = Rejection::status(404, format!("no mock route for {}", url));
				self.handle.schedule_after(default_latency, move || {
					resolver.reject(rejection);
				});
			}
		}
		promise
	}
}
