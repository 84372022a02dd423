//! # hookloop-testkit
//!
//! Test support for hookloop programs.
//!
//! - [`MockTransport`]: scripted responses settled on the event loop
//! - [`RecordingRenderer`]: a renderer that keeps every committed view
//! - [`fixtures`]: rstest fixtures for virtual-time loops and schedulers
//! - [`logging`]: tracing setup and log capture

pub mod fixtures;
pub mod logging;
pub mod renderer;
pub mod transport;

pub use fixtures::{SchedulerHarness, manual_loop, scheduler_with_recorder};
pub use logging::{CapturedEvent, CapturedLogs, capture_logs, init_test_logging};
pub use renderer::RecordingRenderer;
pub use transport::{DEFAULT_LATENCY, MockTransport, RecordedRequest};
