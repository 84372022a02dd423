//! Event Loop
//!
//! A single-threaded cooperative loop with one logical call stack, a
//! microtask queue and a timer-driven macrotask queue.
//!
//! ## Ordering law
//!
//! 1. Every task runs to completion; nothing preempts it.
//! 2. When the stack is empty, the microtask queue is drained completely,
//!    including microtasks queued while draining (a *checkpoint*).
//! 3. Only then is one eligible macrotask dequeued: the one with the earliest
//!    due time, ties broken by enqueue order.
//! 4. After every macrotask another checkpoint runs.
//!
//! ## Non-preemption
//!
//! A long synchronous task starves everything else, timers included. The
//! loop cannot interrupt it; it only reports the hazard through `warn!`
//! events once the task returns (see [`LoopSettings::slow_task_warn_ms`] and
//! [`LoopSettings::microtask_warn_threshold`]).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use hookloop_conf::{LoopSettings, RejectionPolicy};
use tracing::{debug, error, trace, warn};

use crate::error::LoopError;
use crate::promise::{PromiseId, UnhandledRejection};
use crate::time::{Clock, ManualClock, SystemClock};
use crate::timer::{DueTimer, TimerCallback, TimerId, TimerQueue};

type Microtask = Box<dyn FnOnce()>;

/// Unhandled rejections kept for [`EventLoop::take_unhandled_rejections`];
/// older entries are discarded first
pub const MAX_RETAINED_REJECTIONS: usize = 1024;
type RejectionReporter = Rc<dyn Fn(&UnhandledRejection)>;

/// Lifecycle state of an [`EventLoop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
	/// Created; tasks may be queued but nothing runs yet
	Idle,
	Running,
	/// Terminal. Queues are cleared and new tasks are dropped.
	ShutDown,
}

/// What a single [`EventLoop::turn`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnReport {
	/// Microtasks run across both checkpoints of the turn
	pub microtasks: usize,
	/// The macrotask run by the turn, if one was due
	pub macrotask: Option<TimerId>,
}

impl TurnReport {
	/// Whether the turn ran anything at all
	pub fn is_empty(&self) -> bool {
		self.microtasks == 0 && self.macrotask.is_none()
	}
}

/// A rejected promise waiting for the end of the checkpoint to learn whether
/// anyone handled it
pub(crate) trait RejectionCheck {
	fn is_handled(&self) -> bool;
	fn promise_id(&self) -> PromiseId;
	fn reason(&self) -> String;
}

pub(crate) struct LoopShared {
	settings: LoopSettings,
	clock: Rc<dyn Clock>,
	manual_clock: Option<ManualClock>,
	microtasks: RefCell<VecDeque<Microtask>>,
	timers: RefCell<TimerQueue>,
	state: Cell<LoopState>,
	in_turn: Cell<bool>,
	pending_rejections: RefCell<Vec<Rc<dyn RejectionCheck>>>,
	unhandled: RefCell<VecDeque<UnhandledRejection>>,
	reporter: RefCell<Option<RejectionReporter>>,
	strict_violation: RefCell<Option<UnhandledRejection>>,
	next_promise_id: Cell<u64>,
}

impl LoopShared {
	fn is_shut_down(&self) -> bool {
		self.state.get() == LoopState::ShutDown
	}

	fn run_timed<F: FnOnce()>(&self, kind: &'static str, task: F) {
		let started = Instant::now();
		task();
		let elapsed = started.elapsed();
		if elapsed.as_millis() > u128::from(self.settings.slow_task_warn_ms) {
			warn!(
				kind,
				elapsed_ms = elapsed.as_millis() as u64,
				threshold_ms = self.settings.slow_task_warn_ms,
				"task blocked the event loop"
			);
		}
	}

	/// Drain the microtask queue until it stays empty
	fn checkpoint(&self) -> usize {
		let mut ran = 0usize;
		let mut warned = false;
		loop {
			loop {
				let task = self.microtasks.borrow_mut().pop_front();
				let Some(task) = task else {
					break;
				};
				self.run_timed("microtask", task);
				ran += 1;
				if !warned && ran > self.settings.microtask_warn_threshold {
					warned = true;
					warn!(
						ran,
						threshold = self.settings.microtask_warn_threshold,
						"microtask checkpoint is starving macrotasks"
					);
				}
			}
			self.process_rejections();
			if self.microtasks.borrow().is_empty() {
				break;
			}
		}
		if ran > 0 {
			trace!(ran, "microtask checkpoint drained");
		}
		ran
	}

	fn process_rejections(&self) {
		let tracked = std::mem::take(&mut *self.pending_rejections.borrow_mut());
		for check in tracked {
			if check.is_handled() {
				continue;
			}
			let report = UnhandledRejection {
				promise: check.promise_id(),
				reason: check.reason(),
				at: self.clock.now(),
			};
			error!(promise = %report.promise, reason = %report.reason, "unhandled promise rejection");
			{
				let mut unhandled = self.unhandled.borrow_mut();
				if unhandled.len() == MAX_RETAINED_REJECTIONS {
					unhandled.pop_front();
				}
				unhandled.push_back(report.clone());
			}
			if self.settings.rejection_policy == RejectionPolicy::Strict {
				let mut violation = self.strict_violation.borrow_mut();
				if violation.is_none() {
					*violation = Some(report.clone());
				}
			}
			let reporter = self.reporter.borrow().clone();
			if let Some(reporter) = reporter {
				reporter(&report);
			}
		}
	}

	fn run_macrotask(&self, fired: DueTimer) {
		trace!(timer = %fired.id, due_ms = fired.due.as_millis() as u64, "running macrotask");
		let DueTimer { id, due, callback } = fired;
		match callback {
			TimerCallback::Once(task) => self.run_timed("macrotask", task),
			TimerCallback::Repeat(mut task) => {
				self.run_timed("macrotask", &mut task);
				if self.is_shut_down() {
					return;
				}
				let fired = DueTimer {
					id,
					due,
					callback: TimerCallback::Repeat(task),
				};
				let now = self.clock.now();
				let cancelled = self.timers.borrow_mut().rearm(fired, now);
				if cancelled.is_some() {
					trace!(timer = %id, "repeating timer cancelled while running");
				}
				drop(cancelled);
			}
		}
	}

	fn has_ready_work(&self) -> bool {
		if !self.microtasks.borrow().is_empty() || !self.pending_rejections.borrow().is_empty() {
			return true;
		}
		let now = self.clock.now();
		self.timers
			.borrow_mut()
			.next_due()
			.is_some_and(|due| due <= now)
	}
}

/// The event loop itself
///
/// `EventLoop` owns the queues and drives them; tasks reach it through a
/// cloneable [`LoopHandle`].
///
/// # Example
///
/// ```
/// use hookloop_core::{EventLoop, LoopSettings};
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let event_loop = EventLoop::virtual_time(LoopSettings::default());
/// event_loop.start().unwrap();
///
/// let ticks = Rc::new(Cell::new(0));
/// let counter = ticks.clone();
/// event_loop
/// 	.handle()
/// 	.schedule_every(Duration::from_secs(1), move || counter.set(counter.get() + 1));
///
/// event_loop.advance(Duration::from_secs(3)).unwrap();
/// assert_eq!(ticks.get(), 3);
/// ```
pub struct EventLoop {
	shared: Rc<LoopShared>,
}

impl EventLoop {
	/// Create a loop driven by the monotonic wall clock
	pub fn new(settings: LoopSettings) -> Self {
		Self::with_clock(settings, SystemClock::new())
	}

	/// Create a loop driven by an arbitrary clock
	///
	/// [`EventLoop::advance`] is unavailable unless the clock is a
	/// [`ManualClock`] passed through [`EventLoop::with_manual_clock`].
	pub fn with_clock(settings: LoopSettings, clock: impl Clock + 'static) -> Self {
		Self::build(settings, Rc::new(clock), None)
	}

	/// Create a loop on virtual time starting at zero
	pub fn virtual_time(settings: LoopSettings) -> Self {
		Self::with_manual_clock(settings, ManualClock::new())
	}

	/// Create a loop on a shared virtual clock
	pub fn with_manual_clock(settings: LoopSettings, clock: ManualClock) -> Self {
		Self::build(settings, Rc::new(clock.clone()), Some(clock))
	}

	fn build(settings: LoopSettings, clock: Rc<dyn Clock>, manual_clock: Option<ManualClock>) -> Self {
		Self {
			shared: Rc::new(LoopShared {
				settings,
				clock,
				manual_clock,
				microtasks: RefCell::new(VecDeque::new()),
				timers: RefCell::new(TimerQueue::new()),
				state: Cell::new(LoopState::Idle),
				in_turn: Cell::new(false),
				pending_rejections: RefCell::new(Vec::new()),
				unhandled: RefCell::new(VecDeque::new()),
				reporter: RefCell::new(None),
				strict_violation: RefCell::new(None),
				next_promise_id: Cell::new(0),
			}),
		}
	}

	pub fn handle(&self) -> LoopHandle {
		LoopHandle {
			shared: Rc::clone(&self.shared),
		}
	}

	pub fn state(&self) -> LoopState {
		self.shared.state.get()
	}

	pub fn settings(&self) -> &LoopSettings {
		&self.shared.settings
	}

	pub fn now(&self) -> Duration {
		self.shared.clock.now()
	}

	/// The virtual clock, if this loop runs on one
	pub fn manual_clock(&self) -> Option<&ManualClock> {
		self.shared.manual_clock.as_ref()
	}

	pub fn start(&self) -> Result<(), LoopError> {
		match self.shared.state.get() {
			LoopState::Idle => {
				self.shared.state.set(LoopState::Running);
				debug!(
					microtasks = self.pending_microtasks(),
					timers = self.pending_timers(),
					"event loop started"
				);
				Ok(())
			}
			LoopState::Running => Err(LoopError::AlreadyStarted),
			LoopState::ShutDown => Err(LoopError::ShutDown),
		}
	}

	fn ensure_running(&self) -> Result<(), LoopError> {
		match self.shared.state.get() {
			LoopState::Running => Ok(()),
			LoopState::Idle => Err(LoopError::NotRunning),
			LoopState::ShutDown => Err(LoopError::ShutDown),
		}
	}

	/// One checkpoint, then at most one due macrotask followed by another
	/// checkpoint
	///
	/// Under [`RejectionPolicy::Strict`] the first unhandled rejection seen
	/// during the turn is returned as [`LoopError::UnhandledRejection`] after
	/// the turn completes.
	pub fn turn(&self) -> Result<TurnReport, LoopError> {
		self.ensure_running()?;
		if self.shared.in_turn.replace(true) {
			return Err(LoopError::Reentrant);
		}
		let _guard = TurnGuard(&self.shared.in_turn);

		let mut report = TurnReport {
			microtasks: self.shared.checkpoint(),
			macrotask: None,
		};

		let now = self.shared.clock.now();
		let fired = self.shared.timers.borrow_mut().pop_due(now);
		if let Some(fired) = fired {
			report.macrotask = Some(fired.id);
			self.shared.run_macrotask(fired);
			report.microtasks += self.shared.checkpoint();
		}

		if let Some(violation) = self.shared.strict_violation.borrow_mut().take() {
			return Err(LoopError::UnhandledRejection(violation));
		}
		Ok(report)
	}

	/// Run turns until no microtask is queued and no timer is due at the
	/// current time. Returns the number of tasks run.
	pub fn run_until_idle(&self) -> Result<usize, LoopError> {
		self.ensure_running()?;
		let mut ran = 0;
		while self.shared.has_ready_work() {
			let report = self.turn()?;
			ran += report.microtasks + usize::from(report.macrotask.is_some());
			if self.shared.is_shut_down() {
				break;
			}
		}
		Ok(ran)
	}

	/// Move virtual time forward by `by`, firing every timer that falls due
	/// on the way at its own due time
	pub fn advance(&self, by: Duration) -> Result<usize, LoopError> {
		let clock = self
			.shared
			.manual_clock
			.clone()
			.ok_or(LoopError::ManualClockRequired)?;
		self.ensure_running()?;
		let target = clock.now() + by;
		let mut ran = self.run_until_idle()?;
		loop {
			let next = self.shared.timers.borrow_mut().next_due();
			match next {
				Some(due) if due <= target => {
					clock.advance_to(due);
					ran += self.run_until_idle()?;
				}
				_ => break,
			}
			if self.shared.is_shut_down() {
				return Ok(ran);
			}
		}
		clock.advance_to(target);
		ran += self.run_until_idle()?;
		Ok(ran)
	}

	/// Drive the loop for `duration` of its own clock
	///
	/// On virtual time this is [`EventLoop::advance`]; on a wall clock the
	/// thread sleeps between due timers.
	pub fn run_for(&self, duration: Duration) -> Result<usize, LoopError> {
		if self.shared.manual_clock.is_some() {
			return self.advance(duration);
		}
		let deadline = self.now() + duration;
		self.drive(Some(deadline))
	}

	/// Drive the loop until both queues are empty
	///
	/// Never returns while a repeating timer is live. On virtual time the
	/// clock jumps straight to each due timer.
	pub fn run(&self) -> Result<usize, LoopError> {
		self.drive(None)
	}

	fn drive(&self, deadline: Option<Duration>) -> Result<usize, LoopError> {
		self.ensure_running()?;
		let mut ran = 0;
		loop {
			ran += self.run_until_idle()?;
			if self.shared.is_shut_down() {
				return Ok(ran);
			}
			let next = self.shared.timers.borrow_mut().next_due();
			let Some(mut due) = next else {
				return Ok(ran);
			};
			if let Some(deadline) = deadline {
				if due > deadline {
					due = deadline;
				}
				if self.now() >= deadline {
					return Ok(ran);
				}
			}
			match &self.shared.manual_clock {
				Some(clock) => clock.advance_to(due),
				None => {
					let now = self.now();
					if due > now {
						std::thread::sleep(due - now);
					}
				}
			}
		}
	}

	/// Stop the loop and drop every queued task
	///
	/// Idempotent. Handles stay valid but anything they queue afterwards is
	/// discarded.
	pub fn shutdown(&self) {
		if self.shared.is_shut_down() {
			return;
		}
		self.shared.state.set(LoopState::ShutDown);
		let microtasks = std::mem::take(&mut *self.shared.microtasks.borrow_mut());
		let timers = std::mem::take(&mut *self.shared.timers.borrow_mut());
		let rejections = std::mem::take(&mut *self.shared.pending_rejections.borrow_mut());
		debug!(
			dropped_microtasks = microtasks.len(),
			dropped_timers = timers.len(),
			"event loop shut down"
		);
		// Dropped outside the borrows: captured values may touch the handle
		drop(microtasks);
		drop(timers);
		drop(rejections);
	}

	/// Register the callback invoked for each unhandled rejection
	///
	/// Replaces any previously registered reporter. The callback runs at the
	/// end of the checkpoint that detected the rejection; anything it queues
	/// runs within the same checkpoint.
	pub fn on_unhandled_rejection<F>(&self, reporter: F)
	where
		F: Fn(&UnhandledRejection) + 'static,
	{
		*self.shared.reporter.borrow_mut() = Some(Rc::new(reporter));
	}

	/// Drain the record of unhandled rejections seen so far
	///
	/// At most [`MAX_RETAINED_REJECTIONS`] of the most recent ones are kept
	/// between calls; a long-running loop should drain it or register
	/// [`EventLoop::on_unhandled_rejection`] instead.
	pub fn take_unhandled_rejections(&self) -> Vec<UnhandledRejection> {
		self.shared.unhandled.borrow_mut().drain(..).collect()
	}

	pub fn pending_microtasks(&self) -> usize {
		self.shared.microtasks.borrow().len()
	}

	/// Live timers, repeating timers included
	pub fn pending_timers(&self) -> usize {
		self.shared.timers.borrow().len()
	}
}

impl fmt::Debug for EventLoop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventLoop")
			.field("state", &self.state())
			.field("now", &self.now())
			.field("pending_microtasks", &self.pending_microtasks())
			.field("pending_timers", &self.pending_timers())
			.finish()
	}
}

struct TurnGuard<'a>(&'a Cell<bool>);

impl Drop for TurnGuard<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

/// Cloneable access to an [`EventLoop`]'s queues
///
/// Tasks queued before [`EventLoop::start`] wait for the loop to start;
/// tasks queued after [`EventLoop::shutdown`] are dropped.
#[derive(Clone)]
pub struct LoopHandle {
	shared: Rc<LoopShared>,
}

impl LoopHandle {
	pub fn queue_microtask<F>(&self, task: F)
	where
		F: FnOnce() + 'static,
	{
		if self.shared.is_shut_down() {
			debug!("microtask dropped: event loop shut down");
			return;
		}
		self.shared.microtasks.borrow_mut().push_back(Box::new(task));
	}

	/// Queue `task` as a macrotask that becomes eligible after `delay`
	pub fn schedule_after<F>(&self, delay: Duration, task: F) -> TimerId
	where
		F: FnOnce() + 'static,
	{
		let mut timers = self.shared.timers.borrow_mut();
		if self.shared.is_shut_down() {
			debug!("timer dropped: event loop shut down");
			return timers.allocate_id();
		}
		let due = self.shared.clock.now() + delay;
		let id = timers.insert_once(due, Box::new(task));
		trace!(timer = %id, delay_ms = delay.as_millis() as u64, "timer scheduled");
		id
	}

	/// Queue `task` to run every `period` until cancelled
	///
	/// The first run is one period from now. Periods shorter than
	/// [`MIN_PERIOD`](crate::timer::MIN_PERIOD) are clamped. A run that
	/// finishes late does not cause a burst of catch-up runs.
	pub fn schedule_every<F>(&self, period: Duration, task: F) -> TimerId
	where
		F: FnMut() + 'static,
	{
		let mut timers = self.shared.timers.borrow_mut();
		if self.shared.is_shut_down() {
			debug!("interval dropped: event loop shut down");
			return timers.allocate_id();
		}
		let period = period.max(crate::timer::MIN_PERIOD);
		let due = self.shared.clock.now() + period;
		let id = timers.insert_repeating(due, period, Box::new(task));
		trace!(timer = %id, period_ms = period.as_millis() as u64, "interval scheduled");
		id
	}

	/// Queue `task` as a macrotask due immediately
	pub fn post_task<F>(&self, task: F) -> TimerId
	where
		F: FnOnce() + 'static,
	{
		self.schedule_after(Duration::ZERO, task)
	}

	/// Cancel a timer. Returns `false` if it already fired or was cancelled.
	pub fn cancel(&self, id: TimerId) -> bool {
		let removed = self.shared.timers.borrow_mut().cancel(id);
		let cancelled = removed.is_some();
		trace!(timer = %id, cancelled, "timer cancel requested");
		// Dropped outside the borrow: captured values may touch the handle
		drop(removed);
		cancelled
	}

	pub fn now(&self) -> Duration {
		self.shared.clock.now()
	}

	pub fn is_shut_down(&self) -> bool {
		self.shared.is_shut_down()
	}

	pub fn settings(&self) -> &LoopSettings {
		&self.shared.settings
	}

	pub(crate) fn next_promise_id(&self) -> PromiseId {
		let id = self.shared.next_promise_id.get();
		self.shared.next_promise_id.set(id + 1);
		PromiseId::new(id)
	}

	pub(crate) fn track_rejection(&self, check: Rc<dyn RejectionCheck>) {
		if self.shared.is_shut_down() {
			return;
		}
		self.shared.pending_rejections.borrow_mut().push(check);
	}
}

impl fmt::Debug for LoopHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoopHandle")
			.field("state", &self.shared.state.get())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use crate::promise::{Promise, Rejection};

	fn running_loop() -> EventLoop {
		let event_loop = EventLoop::virtual_time(LoopSettings::default());
		event_loop.start().unwrap();
		event_loop
	}

	fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
		let log = Rc::new(RefCell::new(Vec::new()));
		let sink = log.clone();
		let make = move |label: &'static str| -> Box<dyn FnOnce()> {
			let sink = sink.clone();
			Box::new(move || sink.borrow_mut().push(label))
		};
		(log, make)
	}

	#[rstest]
	fn test_lifecycle_transitions() {
		let event_loop = EventLoop::virtual_time(LoopSettings::default());

		assert_eq!(event_loop.turn(), Err(LoopError::NotRunning));
		event_loop.start().unwrap();
		assert_eq!(event_loop.start(), Err(LoopError::AlreadyStarted));
		event_loop.shutdown();
		assert_eq!(event_loop.state(), LoopState::ShutDown);
		assert_eq!(event_loop.start(), Err(LoopError::ShutDown));
		assert_eq!(event_loop.turn(), Err(LoopError::ShutDown));
	}

	#[rstest]
	fn test_microtasks_drain_before_macrotask() {
		// Arrange
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let (log, make) = recorder();
		handle.post_task(make("macro"));
		handle.queue_microtask(make("micro-1"));
		let nested = handle.clone();
		let nested_task = make("micro-nested");
		handle.queue_microtask(move || nested.queue_microtask(nested_task));

		// Act
		let report = event_loop.turn().unwrap();

		// Assert
		assert_eq!(*log.borrow(), vec!["micro-1", "micro-nested", "macro"]);
		assert_eq!(report.microtasks, 3);
		assert!(report.macrotask.is_some());
	}

	#[rstest]
	fn test_one_macrotask_per_turn() {
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let (log, make) = recorder();
		handle.post_task(make("first"));
		handle.post_task(make("second"));

		event_loop.turn().unwrap();
		assert_eq!(*log.borrow(), vec!["first"]);

		event_loop.turn().unwrap();
		assert_eq!(*log.borrow(), vec!["first", "second"]);
		assert!(event_loop.turn().unwrap().is_empty());
	}

	#[rstest]
	fn test_timer_not_eligible_before_due() {
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let (log, make) = recorder();
		handle.schedule_after(Duration::from_millis(100), make("late"));

		event_loop.advance(Duration::from_millis(99)).unwrap();
		assert!(log.borrow().is_empty());

		event_loop.advance(Duration::from_millis(1)).unwrap();
		assert_eq!(*log.borrow(), vec!["late"]);
	}

	#[rstest]
	fn test_advance_runs_timers_at_their_due_time() {
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let seen = Rc::new(RefCell::new(Vec::new()));
		for delay in [30u64, 10, 20] {
			let seen = seen.clone();
			let probe = handle.clone();
			handle.schedule_after(Duration::from_millis(delay), move || {
				seen.borrow_mut().push(probe.now().as_millis() as u64)
			});
		}

		event_loop.advance(Duration::from_millis(50)).unwrap();

		assert_eq!(*seen.borrow(), vec![10, 20, 30]);
		assert_eq!(event_loop.now(), Duration::from_millis(50));
	}

	#[rstest]
	fn test_cancel_interval_from_inside_callback() {
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let ticks = Rc::new(Cell::new(0));
		let id_slot: Rc<Cell<Option<TimerId>>> = Rc::new(Cell::new(None));
		let counter = ticks.clone();
		let canceller = handle.clone();
		let slot = id_slot.clone();
		let id = handle.schedule_every(Duration::from_millis(10), move || {
			counter.set(counter.get() + 1);
			if counter.get() == 2 {
				if let Some(id) = slot.get() {
					canceller.cancel(id);
				}
			}
		});
		id_slot.set(Some(id));

		event_loop.advance(Duration::from_millis(100)).unwrap();

		assert_eq!(ticks.get(), 2);
		assert_eq!(event_loop.pending_timers(), 0);
	}

	#[rstest]
	fn test_unhandled_rejection_record_is_bounded() {
		// Arrange
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let total = MAX_RETAINED_REJECTIONS + 5;

		// Act
		for n in 0..total {
			let _ = Promise::<u8>::rejected(&handle, Rejection::other(format!("r{n}")));
		}
		event_loop.run_until_idle().unwrap();
		let retained = event_loop.take_unhandled_rejections();

		// Assert
		assert_eq!(retained.len(), MAX_RETAINED_REJECTIONS);
		assert_eq!(retained[0].reason, "rejected: r5");
		assert!(event_loop.take_unhandled_rejections().is_empty());
	}

	#[rstest]
	fn test_cancel_drops_callback_outside_timer_borrow() {
		struct RescheduleOnDrop {
			handle: LoopHandle,
			fired: Rc<Cell<bool>>,
		}

		impl Drop for RescheduleOnDrop {
			fn drop(&mut self) {
				let fired = self.fired.clone();
				self.handle.schedule_after(Duration::from_millis(1), move || fired.set(true));
			}
		}

		// Arrange
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let fired = Rc::new(Cell::new(false));
		let guard = RescheduleOnDrop {
			handle: handle.clone(),
			fired: fired.clone(),
		};
		let id = handle.schedule_after(Duration::from_secs(60), move || drop(guard));

		// Act
		let cancelled = handle.cancel(id);
		event_loop.advance(Duration::from_millis(1)).unwrap();

		// Assert
		assert!(cancelled);
		assert!(fired.get());
		assert_eq!(event_loop.pending_timers(), 0);
	}

	#[rstest]
	fn test_advance_requires_manual_clock() {
		let event_loop = EventLoop::new(LoopSettings::default());
		event_loop.start().unwrap();

		assert_eq!(
			event_loop.advance(Duration::from_millis(1)),
			Err(LoopError::ManualClockRequired)
		);
	}

	#[rstest]
	fn test_nested_turn_is_rejected() {
		let event_loop = Rc::new(running_loop());
		let result = Rc::new(RefCell::new(None));
		let inner = event_loop.clone();
		let sink = result.clone();
		event_loop.handle().queue_microtask(move || {
			*sink.borrow_mut() = Some(inner.turn());
		});

		event_loop.turn().unwrap();

		assert_eq!(*result.borrow(), Some(Err(LoopError::Reentrant)));
	}

	#[rstest]
	fn test_shutdown_drops_queued_work() {
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let (log, make) = recorder();
		handle.queue_microtask(make("micro"));
		handle.schedule_after(Duration::from_millis(5), make("timer"));

		event_loop.shutdown();
		handle.queue_microtask(make("after"));

		assert_eq!(event_loop.pending_microtasks(), 0);
		assert_eq!(event_loop.pending_timers(), 0);
		assert!(handle.is_shut_down());
		assert!(log.borrow().is_empty());
	}

	#[rstest]
	fn test_run_jumps_virtual_time_to_each_timer() {
		let event_loop = running_loop();
		let handle = event_loop.handle();
		let (log, make) = recorder();
		handle.schedule_after(Duration::from_secs(5), make("five"));
		handle.schedule_after(Duration::from_secs(1), make("one"));

		let ran = event_loop.run().unwrap();

		assert_eq!(ran, 2);
		assert_eq!(*log.borrow(), vec!["one", "five"]);
		assert_eq!(event_loop.now(), Duration::from_secs(5));
	}
}
