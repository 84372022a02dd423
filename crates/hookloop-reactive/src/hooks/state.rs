//! State hook storage and setters
//!
//! Setter calls never change the value seen by the render in progress.
//! They queue an update and ask the scheduler for a render; the queue is
//! applied in order at the start of that render, so several synchronous
//! calls collapse into a single commit of the final value.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::component::InstanceId;

type Update<T> = Box<dyn FnOnce(&T) -> T>;

/// Accepts render requests from setters
pub(crate) trait RenderNotifier {
	/// Mark `instance` dirty and make sure a drain is scheduled.
	/// Returns `false` when the instance can no longer render.
	fn request_render(&self, instance: InstanceId) -> bool;
}

/// Type-erased access to a state slot's update queue
pub(crate) trait PendingUpdates {
	fn apply_pending(&self) -> usize;
}

pub(crate) struct StateCell<T> {
	value: RefCell<T>,
	pending: RefCell<VecDeque<Update<T>>>,
}

impl<T: 'static> StateCell<T> {
	pub(crate) fn new(value: T) -> Self {
		Self {
			value: RefCell::new(value),
			pending: RefCell::new(VecDeque::new()),
		}
	}

	pub(crate) fn get(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	fn enqueue(&self, update: Update<T>) {
		self.pending.borrow_mut().push_back(update);
	}
}

impl<T: 'static> PendingUpdates for StateCell<T> {
	fn apply_pending(&self) -> usize {
		let mut applied = 0;
		loop {
			let update = self.pending.borrow_mut().pop_front();
			let Some(update) = update else {
				break;
			};
			let next = {
				let current = self.value.borrow();
				update(&current)
			};
			*self.value.borrow_mut() = next;
			applied += 1;
		}
		applied
	}
}

/// Handle for updating one state slot
///
/// Cheap to clone and safe to keep after the instance is gone: once the
/// instance unmounts or the scheduler shuts down, calls do nothing and
/// return `false`.
pub struct StateSetter<T> {
	cell: Weak<StateCell<T>>,
	instance: InstanceId,
	notifier: Weak<dyn RenderNotifier>,
}

impl<T> Clone for StateSetter<T> {
	fn clone(&self) -> Self {
		Self {
			cell: Weak::clone(&self.cell),
			instance: self.instance,
			notifier: Weak::clone(&self.notifier),
		}
	}
}

impl<T> fmt::Debug for StateSetter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateSetter")
			.field("instance", &self.instance)
			.field("live", &(self.cell.strong_count() > 0))
			.finish()
	}
}

impl<T: 'static> StateSetter<T> {
	pub(crate) fn new(cell: &Rc<StateCell<T>>, instance: InstanceId, notifier: Weak<dyn RenderNotifier>) -> Self {
		Self {
			cell: Rc::downgrade(cell),
			instance,
			notifier,
		}
	}

	/// Replace the value at the next render
	pub fn set(&self, value: T) -> bool {
		self.enqueue(Box::new(move |_| value))
	}

	/// Compute the next value from the one before it
	///
	/// Queued updates chain: each sees the result of the previous one.
	pub fn update<F>(&self, update: F) -> bool
	where
		F: FnOnce(&T) -> T + 'static,
	{
		self.enqueue(Box::new(update))
	}

	/// The instance owning this state
	pub fn instance(&self) -> InstanceId {
		self.instance
	}

	fn enqueue(&self, update: Update<T>) -> bool {
		let Some(cell) = self.cell.upgrade() else {
			debug!(instance = %self.instance, "state update ignored: instance unmounted");
			return false;
		};
		let Some(notifier) = self.notifier.upgrade() else {
			debug!(instance = %self.instance, "state update ignored: scheduler dropped");
			return false;
		};
		if !notifier.request_render(self.instance) {
			return false;
		}
		cell.enqueue(update);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	#[derive(Default)]
	struct CountingNotifier {
		requests: Cell<usize>,
		accept: Cell<bool>,
	}

	impl RenderNotifier for CountingNotifier {
		fn request_render(&self, _instance: InstanceId) -> bool {
			self.requests.set(self.requests.get() + 1);
			self.accept.get()
		}
	}

	fn setter(cell: &Rc<StateCell<i32>>, notifier: &Rc<CountingNotifier>) -> StateSetter<i32> {
		let weak = Rc::downgrade(notifier);
		StateSetter::new(cell, InstanceId::new(0), weak)
	}

	#[rstest]
	fn test_updates_apply_in_order_at_next_render() {
		// Arrange
		let cell = Rc::new(StateCell::new(1));
		let notifier = Rc::new(CountingNotifier::default());
		notifier.accept.set(true);
		let set = setter(&cell, &notifier);

		// Act
		set.set(10);
		set.update(|n| n * 2);
		set.update(|n| n + 1);

		// Assert
		assert_eq!(cell.get(), 1);
		assert_eq!(cell.apply_pending(), 3);
		assert_eq!(cell.get(), 21);
		assert_eq!(notifier.requests.get(), 3);
	}

	#[rstest]
	fn test_rejected_request_discards_update() {
		let cell = Rc::new(StateCell::new(1));
		let notifier = Rc::new(CountingNotifier::default());
		let set = setter(&cell, &notifier);

		assert!(!set.set(5));
		assert_eq!(cell.apply_pending(), 0);
	}

	#[rstest]
	fn test_setter_after_drop_is_noop() {
		let cell = Rc::new(StateCell::new(1));
		let notifier = Rc::new(CountingNotifier::default());
		notifier.accept.set(true);
		let set = setter(&cell, &notifier);
		drop(cell);

		assert!(!set.set(2));
		assert_eq!(notifier.requests.get(), 0);
	}
}
