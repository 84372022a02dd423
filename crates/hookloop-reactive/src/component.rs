//! Component trait definition.

use std::fmt;
use std::marker::PhantomData;

use crate::error::{HookResult, SchedulerError};
use crate::hooks::{HookStore, Hooks};

/// Identifier of a mounted component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
	pub(crate) fn new(id: u64) -> Self {
		Self(id)
	}

	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for InstanceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "instance#{}", self.0)
	}
}

/// A render function with persistent per-instance state.
///
/// `render` must be pure apart from hook calls: it reads state through
/// [`Hooks`], declares effects, and returns a view. Side effects belong in
/// [`Hooks::use_effect`].
///
/// Hooks must be called in the same order, the same number of times, on
/// every render. Call them unconditionally at the top level of `render`.
///
/// # Example
///
/// ```
/// use hookloop_reactive::{Component, HookResult, Hooks};
///
/// struct Greeting;
///
/// impl Component for Greeting {
/// 	type View = String;
///
/// 	fn render(&self, hooks: &mut Hooks<'_>) -> HookResult<String> {
/// 		let (name, _set_name) = hooks.use_state("world".to_string())?;
/// 		Ok(format!("Hello, {}!", name))
/// 	}
///
/// 	fn name(&self) -> &'static str {
/// 		"Greeting"
/// 	}
/// }
/// ```
pub trait Component: 'static {
	type View;

	fn render(&self, hooks: &mut Hooks<'_>) -> HookResult<Self::View>;

	/// Name used in logs
	fn name(&self) -> &'static str {
		std::any::type_name::<Self>()
	}
}

/// Component backed by a closure
///
/// Built with [`component`].
pub struct FnComponent<F, V> {
	name: &'static str,
	render: F,
	_view: PhantomData<fn() -> V>,
}

impl<F, V> Component for FnComponent<F, V>
where
	F: Fn(&mut Hooks<'_>) -> HookResult<V> + 'static,
	V: 'static,
{
	type View = V;

	fn render(&self, hooks: &mut Hooks<'_>) -> HookResult<V> {
		(self.render)(hooks)
	}

	fn name(&self) -> &'static str {
		self.name
	}
}

impl<F, V> fmt::Debug for FnComponent<F, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnComponent")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

/// Wrap a closure as a named component
///
/// ```
/// use hookloop_reactive::{component, Component};
///
/// let counter = component("Counter", |hooks| {
/// 	let (count, _set_count) = hooks.use_state(0)?;
/// 	Ok(count)
/// });
/// assert_eq!(counter.name(), "Counter");
/// ```
pub fn component<F, V>(name: &'static str, render: F) -> FnComponent<F, V>
where
	F: Fn(&mut Hooks<'_>) -> HookResult<V> + 'static,
{
	FnComponent {
		name,
		render,
		_view: PhantomData,
	}
}

/// Lifecycle of a component instance
///
/// `Dirty -> Rendering -> Clean` on every successful pass; updates while
/// `Rendering` send the instance back to `Dirty` for the next drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstancePhase {
	Clean,
	/// Waiting in the render queue
	Dirty,
	Rendering,
	/// A render failed; the instance stays mounted but never renders again
	Failed,
	Unmounted,
}

/// A mounted component as owned by the scheduler
///
/// The component and its hook store are taken out while the instance
/// renders, so setters and re-entrant scheduler calls see the record but
/// never alias the store.
pub(crate) struct ComponentInstance<V> {
	pub(crate) name: &'static str,
	pub(crate) component: Option<Box<dyn Component<View = V>>>,
	pub(crate) store: Option<HookStore>,
	pub(crate) phase: InstancePhase,
	/// An update arrived while the instance was rendering
	pub(crate) redirty: bool,
	pub(crate) commits: u64,
	pub(crate) error: Option<SchedulerError>,
}

impl<V: 'static> ComponentInstance<V> {
	pub(crate) fn new(component: Box<dyn Component<View = V>>, validate_hook_shape: bool) -> Self {
		Self {
			name: component.name(),
			component: Some(component),
			store: Some(HookStore::new(validate_hook_shape)),
			phase: InstancePhase::Dirty,
			redirty: false,
			commits: 0,
			error: None,
		}
	}
}

impl<V> fmt::Debug for ComponentInstance<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentInstance")
			.field("name", &self.name)
			.field("phase", &self.phase)
			.field("commits", &self.commits)
			.finish_non_exhaustive()
	}
}
