//! # hookloop-reactive
//!
//! Function-shaped components with persistent per-instance state.
//!
//! ## Architecture
//!
//! 1. **Hook store**: each instance keeps an ordered list of hook slots,
//!    matched to hook calls purely by call order
//! 2. **State hook**: `use_state` returns the slot's value and a setter whose
//!    updates are deferred to the next render and batched
//! 3. **Effect hook**: `use_effect` runs side effects after commit, gated by
//!    value-compared dependency lists, with paired cleanups
//! 4. **Scheduler**: coalesces render requests and drains them as microtasks
//!    on a `hookloop-core` event loop
//!
//! ## Example
//!
//! ```
//! use hookloop_conf::SchedulerSettings;
//! use hookloop_core::{EventLoop, LoopSettings};
//! use hookloop_reactive::{component, deps, InstanceId, Scheduler};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::virtual_time(LoopSettings::default());
//! event_loop.start().unwrap();
//! let handle = event_loop.handle();
//!
//! let views = Rc::new(RefCell::new(Vec::new()));
//! let sink = views.clone();
//! let scheduler = Scheduler::new(&handle, SchedulerSettings::default(), move |_: InstanceId, view: u32| {
//! 	sink.borrow_mut().push(view)
//! });
//!
//! let timers = handle.clone();
//! scheduler
//! 	.mount(component("Counter", move |hooks| {
//! 		let (count, set_count) = hooks.use_state(0u32)?;
//! 		let timers = timers.clone();
//! 		hooks.use_effect(deps![], move || {
//! 			let id = timers.schedule_every(Duration::from_secs(1), move || {
//! 				set_count.update(|c| c + 1);
//! 			});
//! 			Some(move || {
//! 				timers.cancel(id);
//! 			})
//! 		})?;
//! 		Ok(count)
//! 	}))
//! 	.unwrap();
//!
//! event_loop.advance(Duration::from_secs(3)).unwrap();
//! assert_eq!(*views.borrow(), vec![0, 1, 2, 3]);
//! ```

pub mod component;
pub mod error;
pub mod hooks;
pub mod scheduler;
pub mod view;

pub use component::{Component, FnComponent, InstanceId, InstancePhase, component};
pub use error::{HookError, HookKind, HookResult, SchedulerError};
pub use hooks::{Cleanup, DepValue, Deps, EffectCleanup, HookStore, Hooks, StateSetter};
pub use scheduler::Scheduler;
pub use view::{NullRenderer, ViewRenderer};

pub use hookloop_conf::SchedulerSettings;
