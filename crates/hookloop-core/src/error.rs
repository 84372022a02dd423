//! Event loop errors

use crate::promise::UnhandledRejection;

/// Errors returned by [`EventLoop`](crate::EventLoop) lifecycle operations
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
	#[error("event loop already started")]
	AlreadyStarted,

	#[error("event loop is not running")]
	NotRunning,

	#[error("event loop has been shut down")]
	ShutDown,

	#[error("event loop turn requested while a task is already on the stack")]
	Reentrant,

	#[error("operation requires a manual clock")]
	ManualClockRequired,

	#[error("unhandled promise rejection: {0}")]
	UnhandledRejection(UnhandledRejection),
}
