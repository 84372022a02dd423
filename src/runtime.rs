//! An event loop and a scheduler assembled from [`RuntimeSettings`]

use std::fmt;
use std::path::Path;
use std::time::Duration;

use hookloop_conf::{RuntimeSettings, SettingsBuilder, SettingsError};
use hookloop_core::{EventLoop, LoopError, LoopHandle, UnhandledRejection};
use hookloop_reactive::{Component, InstanceId, Scheduler, SchedulerError, ViewRenderer};
use tracing::{debug, info};

/// Errors surfaced by [`Runtime`]
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
	#[error("settings error: {0}")]
	Settings(#[from] SettingsError),

	#[error("event loop error: {0}")]
	Loop(#[from] LoopError),

	#[error("scheduler error: {0}")]
	Scheduler(#[from] SchedulerError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A started event loop with one render scheduler on it
///
/// Dropping the runtime does not run effect cleanups; call
/// [`Runtime::shutdown`] for an orderly teardown.
///
/// # Example
///
/// ```
/// use hookloop::prelude::*;
/// use std::time::Duration;
///
/// let runtime = Runtime::virtual_time(RuntimeSettings::default(), NullRenderer).unwrap();
/// runtime.mount(component("Greeting", |_hooks| Ok("hi"))).unwrap();
/// runtime.advance(Duration::from_millis(5)).unwrap();
/// runtime.shutdown();
/// ```
pub struct Runtime<V> {
	settings: RuntimeSettings,
	event_loop: EventLoop,
	scheduler: Scheduler<V>,
}

impl<V: 'static> Runtime<V> {
	/// Runtime on the monotonic system clock
	pub fn new<R>(settings: RuntimeSettings, renderer: R) -> RuntimeResult<Self>
	where
		R: ViewRenderer<V> + 'static,
	{
		settings.validate()?;
		let event_loop = EventLoop::new(settings.event_loop.clone());
		Self::assemble(settings, event_loop, renderer)
	}

	/// Runtime on virtual time, advanced with [`Runtime::advance`]
	pub fn virtual_time<R>(settings: RuntimeSettings, renderer: R) -> RuntimeResult<Self>
	where
		R: ViewRenderer<V> + 'static,
	{
		settings.validate()?;
		let event_loop = EventLoop::virtual_time(settings.event_loop.clone());
		Self::assemble(settings, event_loop, renderer)
	}

	/// Runtime configured from `path` and `HOOKLOOP_*` environment variables
	///
	/// A missing file contributes nothing.
	pub fn from_config_file<R>(path: impl AsRef<Path>, renderer: R) -> RuntimeResult<Self>
	where
		R: ViewRenderer<V> + 'static,
	{
		let settings = SettingsBuilder::new()
			.with_standard_sources(path.as_ref())
			.build()?;
		Self::new(settings, renderer)
	}

	fn assemble<R>(settings: RuntimeSettings, event_loop: EventLoop, renderer: R) -> RuntimeResult<Self>
	where
		R: ViewRenderer<V> + 'static,
	{
		event_loop.start()?;
		let scheduler = Scheduler::new(&event_loop.handle(), settings.scheduler.clone(), renderer);
		info!(
			policy = ?settings.event_loop.rejection_policy,
			max_render_passes = settings.scheduler.max_render_passes,
			"runtime started"
		);
		Ok(Self {
			settings,
			event_loop,
			scheduler,
		})
	}

	pub fn settings(&self) -> &RuntimeSettings {
		&self.settings
	}

	pub fn event_loop(&self) -> &EventLoop {
		&self.event_loop
	}

	pub fn scheduler(&self) -> &Scheduler<V> {
		&self.scheduler
	}

	pub fn handle(&self) -> LoopHandle {
		self.event_loop.handle()
	}

	/// Mount a root component; it renders at the next checkpoint
	pub fn mount<C>(&self, component: C) -> RuntimeResult<InstanceId>
	where
		C: Component<View = V>,
	{
		Ok(self.scheduler.mount(component)?)
	}

	pub fn unmount(&self, id: InstanceId) -> RuntimeResult<()> {
		Ok(self.scheduler.unmount(id)?)
	}

	/// Run everything ready now
	pub fn run_until_idle(&self) -> RuntimeResult<usize> {
		Ok(self.event_loop.run_until_idle()?)
	}

	/// Move virtual time forward, firing timers as they come due
	pub fn advance(&self, by: Duration) -> RuntimeResult<usize> {
		Ok(self.event_loop.advance(by)?)
	}

	/// Run until no task and no timer remains
	pub fn run(&self) -> RuntimeResult<usize> {
		Ok(self.event_loop.run()?)
	}

	pub fn take_unhandled_rejections(&self) -> Vec<UnhandledRejection> {
		self.event_loop.take_unhandled_rejections()
	}

	/// Unmount every instance, running effect cleanups, then stop the loop
	pub fn shutdown(&self) {
		let mounted = self.scheduler.mounted().len();
		self.scheduler.shutdown();
		self.event_loop.shutdown();
		debug!(mounted, "runtime shut down");
	}
}

impl<V> fmt::Debug for Runtime<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("settings", &self.settings)
			.field("event_loop", &self.event_loop)
			.field("scheduler", &self.scheduler)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hookloop_conf::RejectionPolicy;
	use hookloop_core::{LoopState, Promise, Rejection};
	use hookloop_reactive::{NullRenderer, component};
	use rstest::rstest;

	#[rstest]
	fn test_invalid_settings_are_rejected_before_start() {
		// Arrange
		let mut settings = RuntimeSettings::default();
		settings.scheduler.max_render_passes = 0;

		// Act
		let result = Runtime::<()>::virtual_time(settings, NullRenderer);

		// Assert
		assert!(matches!(
			result,
			Err(RuntimeError::Settings(SettingsError::InvalidValue { .. }))
		));
	}

	#[rstest]
	fn test_strict_policy_surfaces_unhandled_rejection() {
		let mut settings = RuntimeSettings::default();
		settings.event_loop.rejection_policy = RejectionPolicy::Strict;
		let runtime = Runtime::<()>::virtual_time(settings, NullRenderer).unwrap();

		let _ = Promise::<()>::rejected(&runtime.handle(), Rejection::other("boom"));
		let result = runtime.run_until_idle();

		assert!(matches!(
			result,
			Err(RuntimeError::Loop(LoopError::UnhandledRejection(_)))
		));
	}

	#[rstest]
	fn test_mount_after_shutdown_fails() {
		let runtime = Runtime::virtual_time(RuntimeSettings::default(), NullRenderer).unwrap();
		runtime.shutdown();

		let result = runtime.mount(component("Late", |_hooks| Ok(())));

		assert_eq!(runtime.event_loop().state(), LoopState::ShutDown);
		assert!(matches!(result, Err(RuntimeError::Scheduler(SchedulerError::ShutDown))));
	}
}
