//! Promise
//!
//! A single-fire, three-state value bound to an event loop. Continuations
//! attached with [`Promise::then`] and friends are always delivered through
//! the microtask queue: never synchronously, even when the promise has
//! already settled.
//!
//! A rejected promise that has no continuation attached by the end of the
//! microtask checkpoint is reported as an [`UnhandledRejection`].
//!
//! ## Example
//!
//! ```
//! use hookloop_core::{EventLoop, LoopSettings, Promise, Rejection};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let event_loop = EventLoop::virtual_time(LoopSettings::default());
//! event_loop.start().unwrap();
//! let handle = event_loop.handle();
//!
//! let (promise, resolver) = Promise::<u32>::pending(&handle);
//! let seen = Rc::new(RefCell::new(None));
//! let sink = seen.clone();
//! promise
//! 	.then(|n| n * 2)
//! 	.on_settled(move |outcome| *sink.borrow_mut() = Some(outcome));
//!
//! assert!(resolver.resolve(21));
//! assert!(!resolver.reject(Rejection::other("too late")));
//! event_loop.run_until_idle().unwrap();
//! assert_eq!(*seen.borrow(), Some(Ok(42)));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::event_loop::{LoopHandle, RejectionCheck};

/// Identifier of a promise, unique per event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromiseId(u64);

impl PromiseId {
	pub(crate) fn new(id: u64) -> Self {
		Self(id)
	}

	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for PromiseId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "promise#{}", self.0)
	}
}

/// Settlement state. Moves from `Pending` at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromiseState<T, E> {
	Pending,
	Fulfilled(T),
	Rejected(E),
}

impl<T, E> PromiseState<T, E> {
	pub fn is_pending(&self) -> bool {
		matches!(self, Self::Pending)
	}
}

/// Category of a promise rejection
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
	/// The request never produced a response
	Network,
	/// A response arrived with a non-success status
	Status(u16),
	/// The payload could not be decoded
	MalformedPayload,
	Other,
}

impl fmt::Display for RejectionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RejectionKind::Network => write!(f, "network error"),
			RejectionKind::Status(status) => write!(f, "HTTP status {}", status),
			RejectionKind::MalformedPayload => write!(f, "malformed payload"),
			RejectionKind::Other => write!(f, "rejected"),
		}
	}
}

/// Default rejection reason for promises
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Rejection {
	pub kind: RejectionKind,
	pub message: String,
}

impl Rejection {
	pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}

	pub fn network(message: impl Into<String>) -> Self {
		Self::new(RejectionKind::Network, message)
	}

	pub fn status(status: u16, message: impl Into<String>) -> Self {
		Self::new(RejectionKind::Status(status), message)
	}

	pub fn malformed(message: impl Into<String>) -> Self {
		Self::new(RejectionKind::MalformedPayload, message)
	}

	pub fn other(message: impl Into<String>) -> Self {
		Self::new(RejectionKind::Other, message)
	}
}

/// Record of a rejected promise nobody handled
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{promise} rejected without a handler at {at:?}: {reason}")]
pub struct UnhandledRejection {
	pub promise: PromiseId,
	/// Display form of the rejection reason
	pub reason: String,
	/// Loop time at which the rejection was detected
	pub at: Duration,
}

type Reaction<T, E> = Box<dyn FnOnce(Result<T, E>)>;

struct PromiseInner<T, E> {
	id: PromiseId,
	state: RefCell<PromiseState<T, E>>,
	reactions: RefCell<Vec<Reaction<T, E>>>,
	handled: Cell<bool>,
	handle: LoopHandle,
}

impl<T, E: fmt::Display> RejectionCheck for PromiseInner<T, E> {
	fn is_handled(&self) -> bool {
		self.handled.get()
	}

	fn promise_id(&self) -> PromiseId {
		self.id
	}

	fn reason(&self) -> String {
		match &*self.state.borrow() {
			PromiseState::Rejected(reason) => reason.to_string(),
			_ => String::new(),
		}
	}
}

fn settle<T, E>(inner: &Rc<PromiseInner<T, E>>, outcome: Result<T, E>) -> bool
where
	T: Clone + 'static,
	E: Clone + fmt::Display + 'static,
{
	{
		let mut state = inner.state.borrow_mut();
		if !state.is_pending() {
			warn!(promise = %inner.id, "settlement ignored: promise already settled");
			return false;
		}
		*state = match &outcome {
			Ok(value) => PromiseState::Fulfilled(value.clone()),
			Err(reason) => PromiseState::Rejected(reason.clone()),
		};
	}
	trace!(promise = %inner.id, fulfilled = outcome.is_ok(), "promise settled");

	let reactions = std::mem::take(&mut *inner.reactions.borrow_mut());
	if outcome.is_err() && !inner.handled.get() {
		let check: Rc<dyn RejectionCheck> = inner.clone();
		inner.handle.track_rejection(check);
	}
	for reaction in reactions {
		let outcome = outcome.clone();
		inner.handle.queue_microtask(move || reaction(outcome));
	}
	true
}

/// A value that becomes available later on the event loop
///
/// Cloning yields another reference to the same promise.
pub struct Promise<T, E = Rejection> {
	inner: Rc<PromiseInner<T, E>>,
}

impl<T, E> Clone for Promise<T, E> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T, E> fmt::Debug for Promise<T, E>
where
	T: fmt::Debug,
	E: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Promise")
			.field("id", &self.inner.id)
			.field("state", &*self.inner.state.borrow())
			.finish()
	}
}

impl<T, E> Promise<T, E>
where
	T: Clone + 'static,
	E: Clone + fmt::Display + 'static,
{
	/// Create a pending promise together with the resolver that settles it
	pub fn pending(handle: &LoopHandle) -> (Self, Resolver<T, E>) {
		let inner = Rc::new(PromiseInner {
			id: handle.next_promise_id(),
			state: RefCell::new(PromiseState::Pending),
			reactions: RefCell::new(Vec::new()),
			handled: Cell::new(false),
			handle: handle.clone(),
		});
		(
			Self {
				inner: Rc::clone(&inner),
			},
			Resolver { inner },
		)
	}

	/// An already fulfilled promise
	pub fn resolved(handle: &LoopHandle, value: T) -> Self {
		let (promise, resolver) = Self::pending(handle);
		resolver.resolve(value);
		promise
	}

	/// An already rejected promise
	///
	/// Reported as unhandled unless a continuation is attached before the
	/// next checkpoint ends.
	pub fn rejected(handle: &LoopHandle, reason: E) -> Self {
		let (promise, resolver) = Self::pending(handle);
		resolver.reject(reason);
		promise
	}

	pub fn id(&self) -> PromiseId {
		self.inner.id
	}

	/// Snapshot of the current state
	pub fn state(&self) -> PromiseState<T, E> {
		self.inner.state.borrow().clone()
	}

	pub fn is_pending(&self) -> bool {
		self.inner.state.borrow().is_pending()
	}

	pub fn handle(&self) -> &LoopHandle {
		&self.inner.handle
	}

	fn attach(&self, reaction: Reaction<T, E>) {
		self.inner.handled.set(true);
		let settled = match &*self.inner.state.borrow() {
			PromiseState::Pending => None,
			PromiseState::Fulfilled(value) => Some(Ok(value.clone())),
			PromiseState::Rejected(reason) => Some(Err(reason.clone())),
		};
		match settled {
			None => self.inner.reactions.borrow_mut().push(reaction),
			Some(outcome) => self
				.inner
				.handle
				.queue_microtask(move || reaction(outcome)),
		}
	}

	fn derived<U, F>(&self, forward: F) -> Promise<U, E>
	where
		U: Clone + 'static,
		F: FnOnce(Result<T, E>, Resolver<U, E>) + 'static,
	{
		self.derived_with(forward)
	}

	fn derived_with<U, E2, F>(&self, forward: F) -> Promise<U, E2>
	where
		U: Clone + 'static,
		E2: Clone + fmt::Display + 'static,
		F: FnOnce(Result<T, E>, Resolver<U, E2>) + 'static,
	{
		let (next, resolver) = Promise::pending(&self.inner.handle);
		self.attach(Box::new(move |outcome| forward(outcome, resolver)));
		next
	}

	/// Map the fulfilled value; rejections pass through unchanged
	pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
	where
		U: Clone + 'static,
		F: FnOnce(T) -> U + 'static,
	{
		self.derived(move |outcome, resolver| match outcome {
			Ok(value) => {
				resolver.resolve(on_fulfilled(value));
			}
			Err(reason) => {
				resolver.reject(reason);
			}
		})
	}

	/// Chain a promise-returning step, adopting the returned promise's state
	pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
	where
		U: Clone + 'static,
		F: FnOnce(T) -> Promise<U, E> + 'static,
	{
		self.derived(move |outcome, resolver| match outcome {
			Ok(value) => {
				on_fulfilled(value).attach(Box::new(move |inner_outcome| {
					resolver.settle(inner_outcome);
				}));
			}
			Err(reason) => {
				resolver.reject(reason);
			}
		})
	}

	/// Recover from a rejection with a replacement value
	pub fn catch<F>(&self, on_rejected: F) -> Promise<T, E>
	where
		F: FnOnce(E) -> T + 'static,
	{
		self.derived(move |outcome, resolver| {
			resolver.resolve(match outcome {
				Ok(value) => value,
				Err(reason) => on_rejected(reason),
			});
		})
	}

	/// Map the rejection reason; fulfilled values pass through unchanged
	pub fn map_err<E2, F>(&self, on_rejected: F) -> Promise<T, E2>
	where
		E2: Clone + fmt::Display + 'static,
		F: FnOnce(E) -> E2 + 'static,
	{
		self.derived_with(move |outcome, resolver| {
			resolver.settle(outcome.map_err(on_rejected));
		})
	}

	/// Run `on_finally` on either outcome, then forward the outcome
	pub fn finally<F>(&self, on_finally: F) -> Promise<T, E>
	where
		F: FnOnce() + 'static,
	{
		self.derived(move |outcome, resolver| {
			on_finally();
			resolver.settle(outcome);
		})
	}

	/// Terminal continuation receiving the outcome
	///
	/// Counts as handling a rejection.
	pub fn on_settled<F>(&self, on_settled: F)
	where
		F: FnOnce(Result<T, E>) + 'static,
	{
		self.attach(Box::new(on_settled));
	}
}

/// The settling side of a [`Promise`]
///
/// Only the first `resolve` or `reject` across all clones takes effect.
pub struct Resolver<T, E = Rejection> {
	inner: Rc<PromiseInner<T, E>>,
}

impl<T, E> Clone for Resolver<T, E> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T, E> fmt::Debug for Resolver<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolver")
			.field("promise", &self.inner.id)
			.finish_non_exhaustive()
	}
}

impl<T, E> Resolver<T, E>
where
	T: Clone + 'static,
	E: Clone + fmt::Display + 'static,
{
	/// Fulfil the promise. Returns `false` if it had already settled.
	pub fn resolve(&self, value: T) -> bool {
		settle(&self.inner, Ok(value))
	}

	/// Reject the promise. Returns `false` if it had already settled.
	pub fn reject(&self, reason: E) -> bool {
		settle(&self.inner, Err(reason))
	}

	pub fn settle(&self, outcome: Result<T, E>) -> bool {
		settle(&self.inner, outcome)
	}

	pub fn is_settled(&self) -> bool {
		!self.inner.state.borrow().is_pending()
	}

	/// The promise this resolver settles
	pub fn promise(&self) -> Promise<T, E> {
		Promise {
			inner: Rc::clone(&self.inner),
		}
	}
}
