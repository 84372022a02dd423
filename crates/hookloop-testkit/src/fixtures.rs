//! rstest fixtures
//!
//! ```
//! use hookloop_core::EventLoop;
//! use hookloop_testkit::fixtures::manual_loop;
//! use rstest::rstest;
//!
//! #[rstest]
//! fn runs_on_virtual_time(manual_loop: EventLoop) {
//! 	assert!(manual_loop.manual_clock().is_some());
//! }
//! # fn main() {}
//! ```

use hookloop_conf::{LoopSettings, SchedulerSettings};
use hookloop_core::{EventLoop, LoopHandle};
use hookloop_reactive::Scheduler;
use rstest::fixture;

use crate::renderer::RecordingRenderer;
use crate::transport::MockTransport;

/// A started event loop on virtual time
#[fixture]
pub fn manual_loop() -> EventLoop {
	manual_loop_with(LoopSettings::default())
}

/// A started event loop on virtual time with custom settings
pub fn manual_loop_with(settings: LoopSettings) -> EventLoop {
	let event_loop = EventLoop::virtual_time(settings);
	if let Err(err) = event_loop.start() {
		panic!("fresh event loop failed to start: {err}");
	}
	event_loop
}

/// Event loop, scheduler, recorder and mock transport wired together
#[derive(Debug)]
pub struct SchedulerHarness<V> {
	pub event_loop: EventLoop,
	pub scheduler: Scheduler<V>,
	pub renderer: RecordingRenderer<V>,
	transport: MockTransport,
}

impl<V: Clone + 'static> SchedulerHarness<V> {
	pub fn new(loop_settings: LoopSettings, scheduler_settings: SchedulerSettings) -> Self {
		let event_loop = manual_loop_with(loop_settings);
		let renderer = RecordingRenderer::new();
		let scheduler = Scheduler::new(&event_loop.handle(), scheduler_settings, renderer.clone());
		let transport = MockTransport::new(&event_loop.handle());
		Self {
			event_loop,
			scheduler,
			renderer,
			transport,
		}
	}

	pub fn handle(&self) -> LoopHandle {
		self.event_loop.handle()
	}

	/// The harness's mock transport; clones share routes and requests
	pub fn transport(&self) -> MockTransport {
		self.transport.clone()
	}

	/// Run everything ready at the current virtual time
	pub fn settle(&self) -> usize {
		match self.event_loop.run_until_idle() {
			Ok(ran) => ran,
			Err(err) => panic!("event loop failed while settling: {err}"),
		}
	}
}

/// Harness with default settings; the view type is picked by the caller
///
/// ```
/// use hookloop_reactive::component;
/// use hookloop_testkit::fixtures::{scheduler_with_recorder, SchedulerHarness};
///
/// let harness: SchedulerHarness<u8> = scheduler_with_recorder();
/// let id = harness.scheduler.mount(component("Seven", |_hooks| Ok(7))).unwrap();
/// harness.settle();
/// assert_eq!(harness.renderer.views_of(id), vec![7]);
/// ```
pub fn scheduler_with_recorder<V: Clone + 'static>() -> SchedulerHarness<V> {
	SchedulerHarness::new(LoopSettings::default(), SchedulerSettings::default())
}

/// [`scheduler_with_recorder`] for JSON views
#[fixture]
pub fn json_scheduler() -> SchedulerHarness<serde_json::Value> {
	scheduler_with_recorder()
}
