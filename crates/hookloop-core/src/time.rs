//! Clocks driving macrotask due times
//!
//! Time is measured as a [`Duration`] since the clock's origin, which keeps
//! virtual and wall clocks interchangeable.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source
pub trait Clock {
	/// Time elapsed since the clock's origin. Never decreases.
	fn now(&self) -> Duration;
}

/// Virtual clock that only moves when told to
///
/// Clones share the same time, so a test can keep one copy while the event
/// loop owns another.
///
/// # Example
///
/// ```
/// use hookloop_core::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let shared = clock.clone();
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(shared.now(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
	now: Rc<Cell<Duration>>,
}

impl ManualClock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Move time forward by `by`
	pub fn advance(&self, by: Duration) {
		self.now.set(self.now.get() + by);
	}

	/// Move time forward to `to`; earlier targets are ignored
	pub fn advance_to(&self, to: Duration) {
		if to > self.now.get() {
			self.now.set(to);
		}
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Duration {
		self.now.get()
	}
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone)]
pub struct SystemClock {
	origin: Instant,
}

impl SystemClock {
	pub fn new() -> Self {
		Self {
			origin: Instant::now(),
		}
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now(&self) -> Duration {
		self.origin.elapsed()
	}
}
