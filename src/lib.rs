//! # hookloop
//!
//! Function components with persistent per-instance state, driven by a
//! single-threaded event loop.
//!
//! A component is a function that is re-run on every render. State lives in
//! an ordered list of hook slots owned by the component instance, and is
//! matched to `use_state` / `use_effect` calls purely by call order. State
//! updates are batched and rendered from a microtask; effects run after the
//! view is committed.
//!
//! ## Crates
//!
//! - [`hookloop_conf`]: layered settings (defaults, TOML file, environment)
//! - [`hookloop_core`]: event loop, timers, promises, transport contract
//! - [`hookloop_reactive`]: hooks, components and the render scheduler
//! - `hookloop_testkit` (feature `testkit`): mock transport, recording
//!   renderer and rstest fixtures
//!
//! ## Feature Flags
//!
//! - `testkit` - re-export [`hookloop_testkit`] as [`testkit`]
//!
//! ## Quick Example
//!
//! ```
//! use hookloop::prelude::*;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let views = Rc::new(RefCell::new(Vec::new()));
//! let sink = views.clone();
//! let runtime = Runtime::virtual_time(RuntimeSettings::default(), move |_: InstanceId, view: u32| {
//! 	sink.borrow_mut().push(view)
//! })
//! .unwrap();
//!
//! let timers = runtime.handle();
//! runtime
//! 	.mount(component("Ticker", move |hooks| {
//! 		let (ticks, set_ticks) = hooks.use_state(0u32)?;
//! 		let timers = timers.clone();
//! 		hooks.use_effect(deps![], move || {
//! 			let id = timers.schedule_every(Duration::from_millis(500), move || {
//! 				set_ticks.update(|t| t + 1);
//! 			});
//! 			Some(move || {
//! 				timers.cancel(id);
//! 			})
//! 		})?;
//! 		Ok(ticks)
//! 	}))
//! 	.unwrap();
//!
//! runtime.advance(Duration::from_secs(1)).unwrap();
//! assert_eq!(*views.borrow(), vec![0, 1, 2]);
//! ```

pub mod runtime;

pub use hookloop_conf;
pub use hookloop_core;
pub use hookloop_reactive;

#[cfg(feature = "testkit")]
pub use hookloop_testkit as testkit;

pub use runtime::{Runtime, RuntimeError, RuntimeResult};

// Settings
pub use hookloop_conf::{
	ConfigSource, DefaultSource, EnvSource, LoopSettings, RejectionPolicy, RuntimeSettings,
	SchedulerSettings, SettingsBuilder, SettingsError, TomlFileSource,
};

// Event loop, promises and transport
pub use hookloop_core::{
	Clock, EventLoop, LoopError, LoopHandle, LoopState, ManualClock, Promise, PromiseId,
	PromiseState, Rejection, RejectionKind, Resolver, Response, SystemClock, TimerId, Transport,
	TurnReport, UnhandledRejection,
};

// Components, hooks and scheduling
pub use hookloop_reactive::{
	Cleanup, Component, DepValue, Deps, EffectCleanup, FnComponent, HookError, HookKind,
	HookResult, HookStore, Hooks, InstanceId, InstancePhase, NullRenderer, Scheduler,
	SchedulerError, StateSetter, ViewRenderer, component, deps,
};

/// Everything needed to write and mount components
pub mod prelude {
	pub use crate::{
		Component, Deps, EventLoop, HookResult, Hooks, InstanceId, LoopHandle, NullRenderer,
		Promise, Rejection, Response, Runtime, RuntimeSettings, Scheduler, StateSetter, Transport,
		ViewRenderer, component, deps,
	};
}
