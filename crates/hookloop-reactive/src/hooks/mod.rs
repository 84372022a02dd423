//! Hooks available inside [`Component::render`](crate::Component::render)
//!
//! | Hook | Purpose |
//! |------|---------|
//! | [`Hooks::use_state`] | Per-instance state that survives re-renders |
//! | [`Hooks::use_state_with`] | Same, with a lazily computed initial value |
//! | [`Hooks::use_effect`] | Side effects run after the view is committed |

pub mod effect;
pub mod state;
pub mod store;

use std::rc::Weak;

pub use effect::{Cleanup, DepValue, Deps, EffectCleanup};
pub use state::StateSetter;
pub use store::HookStore;

use crate::component::InstanceId;
use crate::error::HookResult;
use state::RenderNotifier;

/// Render-time access to an instance's hook slots
///
/// Handed to [`Component::render`](crate::Component::render); only exists
/// for the duration of one render.
pub struct Hooks<'a> {
	store: &'a mut HookStore,
	instance: InstanceId,
	notifier: Weak<dyn RenderNotifier>,
}

impl<'a> Hooks<'a> {
	pub(crate) fn new(store: &'a mut HookStore, instance: InstanceId, notifier: Weak<dyn RenderNotifier>) -> Self {
		Self {
			store,
			instance,
			notifier,
		}
	}

	/// The instance being rendered
	pub fn instance(&self) -> InstanceId {
		self.instance
	}

	/// Persistent state for this call position.
	///
	/// Returns the current value and a setter. `initial` is only used on the
	/// first render; afterwards the stored value wins.
	///
	/// Setter calls are deferred: the value returned here does not change
	/// during this render. See [`StateSetter`].
	///
	/// # Example
	///
	/// ```
	/// use hookloop_reactive::component;
	///
	/// let counter = component("Counter", |hooks| {
	/// 	let (count, set_count) = hooks.use_state(0)?;
	/// 	if count < 3 {
	/// 		set_count.update(|c| c + 1);
	/// 	}
	/// 	Ok(count)
	/// });
	/// # let _ = counter;
	/// ```
	pub fn use_state<T>(&mut self, initial: T) -> HookResult<(T, StateSetter<T>)>
	where
		T: Clone + 'static,
	{
		self.use_state_with(move || initial)
	}

	/// Like [`Hooks::use_state`], computing the initial value only on the
	/// first render
	pub fn use_state_with<T, F>(&mut self, init: F) -> HookResult<(T, StateSetter<T>)>
	where
		T: Clone + 'static,
		F: FnOnce() -> T,
	{
		let cell = self.store.state(init)?;
		let setter = StateSetter::new(&cell, self.instance, Weak::clone(&self.notifier));
		Ok((cell.get(), setter))
	}

	/// Run a side effect after this render's view is committed.
	///
	/// `deps` decides whether it runs at all (see [`Deps`]). The effect may
	/// return a cleanup, called before its next run and at unmount.
	///
	/// # Example
	///
	/// ```
	/// use hookloop_reactive::{component, deps};
	///
	/// let logger = component("Logger", |hooks| {
	/// 	let (count, _set_count) = hooks.use_state(0)?;
	///
	/// 	// Effect without cleanup, re-run when `count` changes
	/// 	hooks.use_effect(deps![count], move || {
	/// 		println!("count is {}", count);
	/// 		None::<fn()>
	/// 	})?;
	///
	/// 	// Effect with cleanup, run once after mount
	/// 	hooks.use_effect(deps![], || {
	/// 		println!("mounted");
	/// 		Some(|| println!("unmounted"))
	/// 	})?;
	/// 	Ok(count)
	/// });
	/// # let _ = logger;
	/// ```
	pub fn use_effect<F, C>(&mut self, deps: Deps, effect: F) -> HookResult<()>
	where
		F: FnOnce() -> C + 'static,
		C: EffectCleanup,
	{
		self.store
			.effect(deps, Box::new(move || effect().into_cleanup()))
			.map(|_| ())
	}
}

impl std::fmt::Debug for Hooks<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Hooks")
			.field("instance", &self.instance)
			.field("store", &self.store)
			.finish()
	}
}
