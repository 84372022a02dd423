//! # hookloop-core
//!
//! The cooperative execution model underneath hookloop components:
//!
//! 1. **Event loop**: one call stack, a microtask queue and a timer-driven
//!    macrotask queue with a fixed ordering law
//! 2. **Clocks**: virtual time for deterministic tests, monotonic wall time
//!    for real programs
//! 3. **Promises**: three-state, single-fire values whose continuations are
//!    always delivered as microtasks
//! 4. **Transport**: the contract for promise-based HTTP `GET`
//!
//! ## Example
//!
//! ```
//! use hookloop_core::{EventLoop, Promise};
//! use hookloop_conf::LoopSettings;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::virtual_time(LoopSettings::default());
//! event_loop.start().unwrap();
//! let handle = event_loop.handle();
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let timer_log = log.clone();
//! handle.schedule_after(Duration::from_millis(10), move || timer_log.borrow_mut().push("timer"));
//!
//! let promise_log = log.clone();
//! Promise::<i32>::resolved(&handle, 1).then(move |_| promise_log.borrow_mut().push("promise"));
//! log.borrow_mut().push("sync");
//!
//! event_loop.advance(Duration::from_millis(10)).unwrap();
//! assert_eq!(*log.borrow(), vec!["sync", "promise", "timer"]);
//! ```

pub mod error;
pub mod event_loop;
pub mod promise;
pub mod time;
pub mod timer;
pub mod transport;

pub use error::LoopError;
pub use event_loop::{EventLoop, LoopHandle, LoopState, TurnReport};
pub use promise::{
	Promise, PromiseId, PromiseState, Rejection, RejectionKind, Resolver, UnhandledRejection,
};
pub use time::{Clock, ManualClock, SystemClock};
pub use timer::TimerId;
pub use transport::{Response, Transport};

pub use hookloop_conf::{LoopSettings, RejectionPolicy};
