//! Render Scheduler
//!
//! Owns every mounted component instance and decides when each renders.
//!
//! ## Architecture
//!
//! 1. **Render queue**: state updates mark an instance `Dirty` and enqueue
//!    it once; repeated requests coalesce.
//! 2. **Drains**: the first enqueue after a drain starts schedules the next
//!    drain as a microtask on the event loop. A drain renders the instances
//!    queued when it started, each exactly once.
//! 3. **Commit**: each successful render hands its view to the
//!    [`ViewRenderer`], then runs the instance's effects in two phases: all
//!    due cleanups, then all due effect bodies.
//! 4. **Re-entrancy**: updates raised while an instance renders or runs its
//!    effects queue it for the next drain. Chains of drains that keep
//!    re-dirtying instances are cut off at
//!    [`SchedulerSettings::max_render_passes`], even when they would have
//!    settled given more passes.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use hookloop_conf::SchedulerSettings;
use hookloop_core::{LoopError, LoopHandle};
use tracing::{debug, debug_span, error, trace};

use crate::component::{Component, ComponentInstance, InstanceId, InstancePhase};
use crate::error::SchedulerError;
use crate::hooks::store::HookStore;
use crate::hooks::Hooks;
use crate::hooks::state::RenderNotifier;
use crate::view::ViewRenderer;

type ErrorReporter = Rc<dyn Fn(&SchedulerError)>;

/// Deduplicating FIFO of instances waiting to render
#[derive(Debug, Default)]
struct RenderQueue {
	order: VecDeque<InstanceId>,
	members: BTreeSet<InstanceId>,
}

impl RenderQueue {
	fn push(&mut self, id: InstanceId) -> bool {
		if !self.members.insert(id) {
			return false;
		}
		self.order.push_back(id);
		true
	}

	fn remove(&mut self, id: InstanceId) {
		if self.members.remove(&id) {
			self.order.retain(|queued| *queued != id);
		}
	}

	fn take_all(&mut self) -> Vec<InstanceId> {
		self.members.clear();
		self.order.drain(..).collect()
	}

	fn is_empty(&self) -> bool {
		self.order.is_empty()
	}
}

struct SchedulerCore<V> {
	handle: LoopHandle,
	settings: SchedulerSettings,
	renderer: RefCell<Box<dyn ViewRenderer<V>>>,
	instances: RefCell<BTreeMap<InstanceId, ComponentInstance<V>>>,
	queue: RefCell<RenderQueue>,
	drain_scheduled: Cell<bool>,
	draining: Cell<bool>,
	/// Position of the running drain in a chain of drains
	current_pass: Cell<u32>,
	/// Position the scheduled drain will take
	next_pass: Cell<u32>,
	next_instance: Cell<u64>,
	shut_down: Cell<bool>,
	on_error: RefCell<Option<ErrorReporter>>,
	this: Weak<SchedulerCore<V>>,
}

impl<V: 'static> SchedulerCore<V> {
	fn notifier(&self) -> Weak<dyn RenderNotifier> {
		self.this.clone()
	}

	fn report(&self, err: &SchedulerError) {
		error!(error = %err, "component error");
		let reporter = self.on_error.borrow().clone();
		if let Some(reporter) = reporter {
			reporter(err);
		}
	}

	fn fail(&self, id: InstanceId, err: SchedulerError) {
		if let Some(record) = self.instances.borrow_mut().get_mut(&id) {
			record.phase = InstancePhase::Failed;
			record.redirty = false;
			record.error = Some(err.clone());
		}
		self.queue.borrow_mut().remove(id);
		self.report(&err);
	}

	/// Queue `id` and make sure a drain will run
	fn enqueue(&self, id: InstanceId) {
		if !self.queue.borrow_mut().push(id) {
			return;
		}
		trace!(instance = %id, "render requested");
		if self.drain_scheduled.replace(true) {
			return;
		}
		let pass = if self.draining.get() {
			self.current_pass.get() + 1
		} else {
			1
		};
		self.next_pass.set(pass);
		let this = self.this.clone();
		self.handle.queue_microtask(move || {
			if let Some(core) = this.upgrade() {
				core.drain();
			}
		});
	}

	/// Render everything queued when the drain starts
	fn drain(&self) -> usize {
		if self.draining.get() || self.shut_down.get() {
			return 0;
		}
		self.drain_scheduled.set(false);
		let pass = self.next_pass.replace(1).max(1);
		let batch = self.queue.borrow_mut().take_all();
		if batch.is_empty() {
			return 0;
		}

		if pass > self.settings.max_render_passes {
			for id in batch {
				self.fail(
					id,
					SchedulerError::RenderLoopLimit {
						instance: id,
						limit: self.settings.max_render_passes,
					},
				);
			}
			return 0;
		}

		let span = debug_span!("drain", pass, instances = batch.len());
		let _enter = span.enter();
		self.draining.set(true);
		self.current_pass.set(pass);
		let mut commits = 0;
		for id in batch {
			if self.render_instance(id) {
				commits += 1;
			}
		}
		self.draining.set(false);
		trace!(commits, "drain finished");
		commits
	}

	fn render_instance(&self, id: InstanceId) -> bool {
		let (name, component, mut store) = {
			let mut instances = self.instances.borrow_mut();
			let Some(record) = instances.get_mut(&id) else {
				return false;
			};
			if record.phase != InstancePhase::Dirty {
				return false;
			}
			let (Some(component), Some(store)) = (record.component.take(), record.store.take()) else {
				return false;
			};
			record.phase = InstancePhase::Rendering;
			record.redirty = false;
			(record.name, component, store)
		};

		let span = debug_span!("render", instance = %id, component = name);
		let _enter = span.enter();

		let applied = store.begin_render();
		let rendered = {
			let mut hooks = Hooks::new(&mut store, id, self.notifier());
			component.render(&mut hooks)
		};
		let outcome = match rendered {
			Ok(view) => store.finish_render().map(|()| view),
			Err(err) => {
				store.abort_render();
				Err(err)
			}
		};

		match outcome {
			Ok(_) if !self.instances.borrow().contains_key(&id) => {
				self.restore(id, component, store, |_| {});
				false
			}
			Ok(view) => {
				self.renderer.borrow_mut().commit(id, view);
				debug!(applied, "view committed");
				self.run_effects(&mut store);
				self.restore(id, component, store, |record| {
					record.commits += 1;
					record.phase = if record.redirty {
						InstancePhase::Dirty
					} else {
						InstancePhase::Clean
					};
				});
				true
			}
			Err(err) => {
				self.restore(id, component, store, |_| {});
				self.fail(id, SchedulerError::Hook { instance: id, source: err });
				false
			}
		}
	}

	/// Put a rendered instance's parts back, or tear the store down if the
	/// instance was unmounted meanwhile
	fn restore<F>(&self, id: InstanceId, component: Box<dyn Component<View = V>>, mut store: HookStore, finish: F)
	where
		F: FnOnce(&mut ComponentInstance<V>),
	{
		let mut instances = self.instances.borrow_mut();
		if let Some(record) = instances.get_mut(&id) {
			record.component = Some(component);
			record.store = Some(store);
			finish(record);
			return;
		}
		drop(instances);
		drop(component);
		let cleanups = store.teardown();
		debug!(instance = %id, cleanups, "instance unmounted during render");
	}

	fn run_effects(&self, store: &mut HookStore) {
		let mut effects = store.take_scheduled_effects();
		if effects.is_empty() {
			return;
		}
		let mut cleanups = 0;
		for effect in &mut effects {
			if let Some(cleanup) = effect.cleanup.take() {
				cleanup.run();
				cleanups += 1;
			}
		}
		let runs = effects.len();
		for effect in effects {
			let cleanup = (effect.run)();
			store.settle_effect(effect.index, effect.deps, cleanup);
		}
		trace!(cleanups, runs, "effects committed");
	}

	fn unmount(&self, id: InstanceId) -> Result<(), SchedulerError> {
		let record = self
			.instances
			.borrow_mut()
			.remove(&id)
			.ok_or(SchedulerError::UnknownInstance(id))?;
		self.queue.borrow_mut().remove(id);
		let ComponentInstance { store, .. } = record;
		match store {
			Some(mut store) => {
				let cleanups = store.teardown();
				debug!(instance = %id, cleanups, "instance unmounted");
			}
			// Rendering right now; `restore` finishes the teardown
			None => debug!(instance = %id, "instance unmounted while rendering"),
		}
		self.renderer.borrow_mut().unmount(id);
		Ok(())
	}
}

impl<V: 'static> RenderNotifier for SchedulerCore<V> {
	fn request_render(&self, instance: InstanceId) -> bool {
		if self.shut_down.get() {
			debug!(instance = %instance, "state update ignored: scheduler shut down");
			return false;
		}
		{
			let mut instances = self.instances.borrow_mut();
			let Some(record) = instances.get_mut(&instance) else {
				debug!(instance = %instance, "state update ignored: instance unmounted");
				return false;
			};
			match record.phase {
				InstancePhase::Clean => record.phase = InstancePhase::Dirty,
				InstancePhase::Dirty => return true,
				InstancePhase::Rendering => record.redirty = true,
				InstancePhase::Failed | InstancePhase::Unmounted => {
					debug!(instance = %instance, phase = ?record.phase, "state update ignored");
					return false;
				}
			}
		}
		self.enqueue(instance);
		true
	}
}

/// Renders mounted components in batches on an event loop
///
/// Cloning yields another handle to the same scheduler.
///
/// # Example
///
/// ```
/// use hookloop_conf::SchedulerSettings;
/// use hookloop_core::{EventLoop, LoopSettings};
/// use hookloop_reactive::{component, InstanceId, Scheduler};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let event_loop = EventLoop::virtual_time(LoopSettings::default());
/// event_loop.start().unwrap();
///
/// let views = Rc::new(RefCell::new(Vec::new()));
/// let sink = views.clone();
/// let scheduler = Scheduler::new(
/// 	&event_loop.handle(),
/// 	SchedulerSettings::default(),
/// 	move |_: InstanceId, view: String| sink.borrow_mut().push(view),
/// );
///
/// scheduler
/// 	.mount(component("Hello", |_hooks| Ok("hello".to_string())))
/// 	.unwrap();
/// assert!(views.borrow().is_empty());
///
/// event_loop.run_until_idle().unwrap();
/// assert_eq!(*views.borrow(), vec!["hello"]);
/// ```
pub struct Scheduler<V> {
	core: Rc<SchedulerCore<V>>,
}

impl<V> Clone for Scheduler<V> {
	fn clone(&self) -> Self {
		Self {
			core: Rc::clone(&self.core),
		}
	}
}

impl<V: 'static> Scheduler<V> {
	pub fn new<R>(handle: &LoopHandle, settings: SchedulerSettings, renderer: R) -> Self
	where
		R: ViewRenderer<V> + 'static,
	{
		let core = Rc::new_cyclic(|this| SchedulerCore {
			handle: handle.clone(),
			settings,
			renderer: RefCell::new(Box::new(renderer)),
			instances: RefCell::new(BTreeMap::new()),
			queue: RefCell::new(RenderQueue::default()),
			drain_scheduled: Cell::new(false),
			draining: Cell::new(false),
			current_pass: Cell::new(0),
			next_pass: Cell::new(1),
			next_instance: Cell::new(0),
			shut_down: Cell::new(false),
			on_error: RefCell::new(None),
			this: Weak::clone(this),
		});
		Self { core }
	}

	pub fn handle(&self) -> &LoopHandle {
		&self.core.handle
	}

	pub fn settings(&self) -> &SchedulerSettings {
		&self.core.settings
	}

	/// Mount a component. Its first render happens at the next microtask
	/// checkpoint, not here.
	pub fn mount<C>(&self, component: C) -> Result<InstanceId, SchedulerError>
	where
		C: Component<View = V>,
	{
		self.mount_boxed(Box::new(component))
	}

	pub fn mount_boxed(&self, component: Box<dyn Component<View = V>>) -> Result<InstanceId, SchedulerError> {
		if self.core.shut_down.get() {
			return Err(SchedulerError::ShutDown);
		}
		if self.core.handle.is_shut_down() {
			return Err(SchedulerError::Loop(LoopError::ShutDown));
		}
		let id = InstanceId::new(self.core.next_instance.get());
		self.core.next_instance.set(id.as_u64() + 1);
		let record = ComponentInstance::new(component, self.core.settings.validate_hook_shape);
		debug!(instance = %id, component = record.name, "component mounted");
		self.core.instances.borrow_mut().insert(id, record);
		self.core.enqueue(id);
		Ok(id)
	}

	/// Unmount an instance, running every outstanding effect cleanup
	pub fn unmount(&self, id: InstanceId) -> Result<(), SchedulerError> {
		self.core.unmount(id)
	}

	/// Render whatever is queued right now, without waiting for the
	/// scheduled microtask. Returns the number of commits.
	///
	/// Does nothing when called from inside a drain.
	pub fn drain_once(&self) -> Result<usize, SchedulerError> {
		if self.core.shut_down.get() {
			return Err(SchedulerError::ShutDown);
		}
		Ok(self.core.drain())
	}

	/// Unmount every instance and refuse further work. Idempotent.
	pub fn shutdown(&self) {
		if self.core.shut_down.replace(true) {
			return;
		}
		let ids: Vec<InstanceId> = self.core.instances.borrow().keys().copied().collect();
		for id in &ids {
			if let Err(err) = self.core.unmount(*id) {
				debug!(instance = %id, error = %err, "unmount during shutdown failed");
			}
		}
		self.core.queue.borrow_mut().take_all();
		debug!(unmounted = ids.len(), "scheduler shut down");
	}

	pub fn is_shut_down(&self) -> bool {
		self.core.shut_down.get()
	}

	/// Register a callback for every scheduler error, replacing any previous one
	pub fn on_error<F>(&self, reporter: F)
	where
		F: Fn(&SchedulerError) + 'static,
	{
		*self.core.on_error.borrow_mut() = Some(Rc::new(reporter));
	}

	/// Phase of an instance; `Unmounted` for ids that were mounted and are gone
	pub fn phase(&self, id: InstanceId) -> Option<InstancePhase> {
		match self.core.instances.borrow().get(&id) {
			Some(record) => Some(record.phase),
			None if id.as_u64() < self.core.next_instance.get() => Some(InstancePhase::Unmounted),
			None => None,
		}
	}

	/// Number of views committed for an instance
	pub fn commit_count(&self, id: InstanceId) -> Option<u64> {
		self.core
			.instances
			.borrow()
			.get(&id)
			.map(|record| record.commits)
	}

	/// Number of hook slots; `None` while the instance renders
	pub fn slot_count(&self, id: InstanceId) -> Option<usize> {
		self.core
			.instances
			.borrow()
			.get(&id)
			.and_then(|record| record.store.as_ref().map(HookStore::len))
	}

	/// The error that failed an instance
	pub fn instance_error(&self, id: InstanceId) -> Option<SchedulerError> {
		self.core
			.instances
			.borrow()
			.get(&id)
			.and_then(|record| record.error.clone())
	}

	/// Currently mounted instances in mount order
	pub fn mounted(&self) -> Vec<InstanceId> {
		self.core.instances.borrow().keys().copied().collect()
	}

	/// Whether any instance waits for a render
	pub fn has_pending_renders(&self) -> bool {
		!self.core.queue.borrow().is_empty()
	}
}

impl<V> fmt::Debug for Scheduler<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler")
			.field("instances", &self.core.instances.borrow().len())
			.field("queued", &self.core.queue.borrow().order.len())
			.field("shut_down", &self.core.shut_down.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::component;
	use crate::deps;
	use crate::error::HookError;
	use crate::hooks::Deps;
	use hookloop_core::{EventLoop, LoopSettings};
	use rstest::{fixture, rstest};

	type Views = Rc<RefCell<Vec<(InstanceId, i32)>>>;

	struct Harness {
		event_loop: EventLoop,
		scheduler: Scheduler<i32>,
		views: Views,
	}

	impl Harness {
		fn views_of(&self, id: InstanceId) -> Vec<i32> {
			self.views
				.borrow()
				.iter()
				.filter(|(instance, _)| *instance == id)
				.map(|(_, view)| *view)
				.collect()
		}

		fn settle(&self) {
			self.event_loop.run_until_idle().unwrap();
		}
	}

	fn harness_with(settings: SchedulerSettings) -> Harness {
		let event_loop = EventLoop::virtual_time(LoopSettings::default());
		event_loop.start().unwrap();
		let views: Views = Rc::new(RefCell::new(Vec::new()));
		let sink = views.clone();
		let scheduler = Scheduler::new(&event_loop.handle(), settings, move |id: InstanceId, view: i32| {
			sink.borrow_mut().push((id, view))
		});
		Harness {
			event_loop,
			scheduler,
			views,
		}
	}

	#[fixture]
	fn harness() -> Harness {
		harness_with(SchedulerSettings::default())
	}

	#[rstest]
	fn test_mount_renders_at_next_checkpoint(harness: Harness) {
		let id = harness
			.scheduler
			.mount(component("Static", |_hooks| Ok(5)))
			.unwrap();

		assert_eq!(harness.scheduler.phase(id), Some(InstancePhase::Dirty));
		assert!(harness.views.borrow().is_empty());

		harness.settle();

		assert_eq!(harness.views_of(id), vec![5]);
		assert_eq!(harness.scheduler.phase(id), Some(InstancePhase::Clean));
		assert_eq!(harness.scheduler.commit_count(id), Some(1));
	}

	#[rstest]
	fn test_synchronous_sets_commit_only_final_value(harness: Harness) {
		// Arrange
		let setter = Rc::new(RefCell::new(None));
		let slot = setter.clone();
		let id = harness
			.scheduler
			.mount(component("Batch", move |hooks| {
				let (value, set_value) = hooks.use_state(0)?;
				*slot.borrow_mut() = Some(set_value);
				Ok(value)
			}))
			.unwrap();
		harness.settle();

		// Act
		let set = setter.borrow().clone().unwrap();
		assert!(set.set(1));
		assert!(set.set(2));
		assert!(set.update(|v| v + 1));
		harness.settle();

		// Assert
		assert_eq!(harness.views_of(id), vec![0, 3]);
	}

	#[rstest]
	fn test_update_during_render_defers_to_next_drain(harness: Harness) {
		let id = harness
			.scheduler
			.mount(component("SelfUpdating", |hooks| {
				let (value, set_value) = hooks.use_state(0)?;
				if value < 2 {
					set_value.update(|v| v + 1);
				}
				Ok(value)
			}))
			.unwrap();

		harness.settle();

		assert_eq!(harness.views_of(id), vec![0, 1, 2]);
		assert_eq!(harness.scheduler.phase(id), Some(InstancePhase::Clean));
	}

	#[rstest]
	fn test_effect_runs_after_commit_with_cleanup_before_rerun(harness: Harness) {
		// Arrange
		let log = Rc::new(RefCell::new(Vec::new()));
		let views = harness.views.clone();
		let setter = Rc::new(RefCell::new(None));
		let slot = setter.clone();
		let effect_log = log.clone();
		let id = harness
			.scheduler
			.mount(component("Effectful", move |hooks| {
				let (value, set_value) = hooks.use_state(0)?;
				*slot.borrow_mut() = Some(set_value);
				let log = effect_log.clone();
				let views = views.clone();
				hooks.use_effect(deps![value], move || {
					let committed = views.borrow().last().map(|(_, v)| *v);
					log.borrow_mut().push(format!("run {} after commit {:?}", value, committed));
					let log = log.clone();
					Some(move || log.borrow_mut().push(format!("cleanup {}", value)))
				})?;
				Ok(value)
			}))
			.unwrap();
		harness.settle();

		// Act
		let set = setter.borrow().clone().unwrap();
		set.set(0);
		harness.settle();
		set.set(7);
		harness.settle();
		harness.scheduler.unmount(id).unwrap();

		// Assert
		assert_eq!(
			*log.borrow(),
			vec![
				"run 0 after commit Some(0)",
				"cleanup 0",
				"run 7 after commit Some(7)",
				"cleanup 7",
			]
		);
		assert_eq!(harness.views_of(id), vec![0, 0, 7]);
	}

	#[rstest]
	fn test_cleanups_run_before_new_effects_of_same_instance(harness: Harness) {
		let log = Rc::new(RefCell::new(Vec::new()));
		let sink = log.clone();
		let setter = Rc::new(RefCell::new(None));
		let slot = setter.clone();
		harness
			.scheduler
			.mount(component("TwoEffects", move |hooks| {
				let (value, set_value) = hooks.use_state(0)?;
				*slot.borrow_mut() = Some(set_value);
				for name in ["a", "b"] {
					let log = sink.clone();
					hooks.use_effect(Deps::Always, move || {
						log.borrow_mut().push(format!("run {}{}", name, value));
						let log = log.clone();
						Some(move || log.borrow_mut().push(format!("cleanup {}{}", name, value)))
					})?;
				}
				Ok(value)
			}))
			.unwrap();
		harness.settle();

		setter.borrow().clone().unwrap().set(1);
		harness.settle();

		assert_eq!(
			*log.borrow(),
			vec!["run a0", "run b0", "cleanup a0", "cleanup b0", "run a1", "run b1"]
		);
	}

	#[rstest]
	fn test_effect_setting_state_rerenders_until_stable(harness: Harness) {
		// Arrange
		let id = harness
			.scheduler
			.mount(component("StepUp", |hooks| {
				let (value, set_value) = hooks.use_state(0)?;
				hooks.use_effect(deps![value], move || {
					if value < 3 {
						set_value.set(value + 1);
					}
				})?;
				Ok(value)
			}))
			.unwrap();

		// Act
		harness.settle();

		// Assert
		assert_eq!(harness.views_of(id), vec![0, 1, 2, 3]);
		assert_eq!(harness.scheduler.phase(id), Some(InstancePhase::Clean));
		assert_eq!(harness.scheduler.commit_count(id), Some(4));
	}

	#[rstest]
	fn test_instance_unmounted_during_render_is_not_committed(harness: Harness) {
		// Arrange
		let effect_runs = Rc::new(Cell::new(0));
		let runs = effect_runs.clone();
		let scheduler = Rc::new(RefCell::new(None::<Scheduler<i32>>));
		let own = Rc::new(Cell::new(None::<InstanceId>));
		let (inner_scheduler, inner_own) = (scheduler.clone(), own.clone());
		let id = harness
			.scheduler
			.mount(component("SelfRemoving", move |hooks| {
				let runs = runs.clone();
				hooks.use_effect(Deps::Always, move || runs.set(runs.get() + 1))?;
				let target = inner_own.get();
				if let (Some(scheduler), Some(target)) = (inner_scheduler.borrow().as_ref(), target) {
					scheduler.unmount(target).unwrap();
				}
				Ok(1)
			}))
			.unwrap();
		*scheduler.borrow_mut() = Some(harness.scheduler.clone());
		own.set(Some(id));

		// Act
		harness.settle();
		scheduler.borrow_mut().take();

		// Assert
		assert!(harness.views_of(id).is_empty());
		assert_eq!(effect_runs.get(), 0);
		assert_eq!(harness.scheduler.phase(id), Some(InstancePhase::Unmounted));
		assert!(harness.scheduler.mounted().is_empty());
	}

	#[rstest]
	fn test_hook_violation_fails_only_that_instance(harness: Harness) {
		// Arrange
		let errors = Rc::new(RefCell::new(Vec::new()));
		let sink = errors.clone();
		harness.scheduler.on_error(move |err| sink.borrow_mut().push(err.clone()));
		let setter = Rc::new(RefCell::new(None));
		let slot = setter.clone();
		let broken = harness
			.scheduler
			.mount(component("Conditional", move |hooks| {
				let (flag, set_flag) = hooks.use_state(false)?;
				*slot.borrow_mut() = Some(set_flag);
				if flag {
					hooks.use_state(0)?;
				}
				Ok(1)
			}))
			.unwrap();
		let healthy = harness
			.scheduler
			.mount(component("Healthy", |_hooks| Ok(2)))
			.unwrap();
		harness.settle();

		// Act
		setter.borrow().clone().unwrap().set(true);
		harness.settle();

		// Assert
		let expected = SchedulerError::Hook {
			instance: broken,
			source: HookError::SlotCountMismatch { expected: 1, found: 2 },
		};
		assert_eq!(harness.scheduler.phase(broken), Some(InstancePhase::Failed));
		assert_eq!(harness.scheduler.instance_error(broken), Some(expected.clone()));
		assert_eq!(*errors.borrow(), vec![expected]);
		assert_eq!(harness.views_of(broken), vec![1]);
		assert_eq!(harness.views_of(healthy), vec![2]);
		assert!(!setter.borrow().clone().unwrap().set(false));
	}

	#[rstest]
	fn test_render_loop_is_cut_off() {
		let harness = harness_with(SchedulerSettings {
			max_render_passes: 5,
			..SchedulerSettings::default()
		});
		let id = harness
			.scheduler
			.mount(component("Runaway", |hooks| {
				let (value, set_value) = hooks.use_state(0)?;
				set_value.set(value + 1);
				Ok(value)
			}))
			.unwrap();

		harness.settle();

		assert_eq!(harness.views_of(id), vec![0, 1, 2, 3, 4]);
		assert_eq!(
			harness.scheduler.instance_error(id),
			Some(SchedulerError::RenderLoopLimit { instance: id, limit: 5 })
		);
	}

	#[rstest]
	fn test_converging_chain_longer_than_limit_is_cut_off() {
		// Arrange
		let harness = harness_with(SchedulerSettings {
			max_render_passes: 3,
			..SchedulerSettings::default()
		});
		let id = harness
			.scheduler
			.mount(component("CountToSix", |hooks| {
				let (value, set_value) = hooks.use_state(0)?;
				if value < 6 {
					set_value.set(value + 1);
				}
				Ok(value)
			}))
			.unwrap();

		// Act
		harness.settle();

		// Assert
		assert_eq!(harness.views_of(id), vec![0, 1, 2]);
		assert_eq!(
			harness.scheduler.instance_error(id),
			Some(SchedulerError::RenderLoopLimit { instance: id, limit: 3 })
		);
	}

	#[rstest]
	fn test_setter_after_unmount_is_noop(harness: Harness) {
		let setter = Rc::new(RefCell::new(None));
		let slot = setter.clone();
		let id = harness
			.scheduler
			.mount(component("Gone", move |hooks| {
				let (value, set_value) = hooks.use_state(0)?;
				*slot.borrow_mut() = Some(set_value);
				Ok(value)
			}))
			.unwrap();
		harness.settle();

		harness.scheduler.unmount(id).unwrap();
		let set = setter.borrow().clone().unwrap();

		assert!(!set.set(1));
		assert_eq!(harness.scheduler.phase(id), Some(InstancePhase::Unmounted));
		assert_eq!(
			harness.scheduler.unmount(id),
			Err(SchedulerError::UnknownInstance(id))
		);
	}

	#[rstest]
	fn test_shutdown_unmounts_everything(harness: Harness) {
		let cleaned = Rc::new(Cell::new(0));
		for _ in 0..3 {
			let counter = cleaned.clone();
			harness
				.scheduler
				.mount(component("Once", move |hooks| {
					let counter = counter.clone();
					hooks.use_effect(deps![], move || Some(move || counter.set(counter.get() + 1)))?;
					Ok(0)
				}))
				.unwrap();
		}
		harness.settle();

		harness.scheduler.shutdown();
		harness.scheduler.shutdown();

		assert_eq!(cleaned.get(), 3);
		assert!(harness.scheduler.mounted().is_empty());
		assert!(matches!(
			harness.scheduler.mount(component("Late", |_hooks| Ok(0))),
			Err(SchedulerError::ShutDown)
		));
	}

	#[rstest]
	fn test_drain_once_renders_without_event_loop(harness: Harness) {
		let id = harness
			.scheduler
			.mount(component("Direct", |_hooks| Ok(9)))
			.unwrap();

		assert_eq!(harness.scheduler.drain_once().unwrap(), 1);
		assert_eq!(harness.views_of(id), vec![9]);

		// The scheduled microtask finds nothing left to do
		harness.settle();
		assert_eq!(harness.views_of(id), vec![9]);
	}
}
