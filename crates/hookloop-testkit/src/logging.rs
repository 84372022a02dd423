//! Tracing helpers for tests

use std::sync::{Arc, Mutex, MutexGuard, Once};

use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static INIT: Once = Once::new();

/// Install a global fmt subscriber that writes through the test harness
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
	INIT.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_max_level(Level::DEBUG)
			.with_test_writer()
			.try_init();
	});
}

/// One captured event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
	pub level: Level,
	pub target: String,
	pub message: String,
}

/// Events recorded by [`capture_logs`]
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
	events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
	fn lock(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
		self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub fn events(&self) -> Vec<CapturedEvent> {
		self.lock().clone()
	}

	/// Number of events at `level` whose message contains `needle`
	pub fn count(&self, level: Level, needle: &str) -> usize {
		self.lock()
			.iter()
			.filter(|event| event.level == level && event.message.contains(needle))
			.count()
	}

	pub fn contains(&self, level: Level, needle: &str) -> bool {
		self.count(level, needle) > 0
	}

	pub fn clear(&self) {
		self.lock().clear();
	}
}

struct LogCapture {
	logs: CapturedLogs,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
	fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
		struct MessageVisitor {
			message: String,
		}

		impl tracing::field::Visit for MessageVisitor {
			fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
				if field.name() == "message" {
					self.message = format!("{:?}", value);
				}
			}
		}

		let mut visitor = MessageVisitor {
			message: String::new(),
		};
		event.record(&mut visitor);
		self.logs.lock().push(CapturedEvent {
			level: *event.metadata().level(),
			target: event.metadata().target().to_string(),
			message: visitor.message,
		});
	}
}

/// Capture events on the current thread until the guard drops
///
/// ```
/// use hookloop_testkit::logging::capture_logs;
/// use tracing::Level;
///
/// let (logs, _guard) = capture_logs();
/// tracing::warn!("disk almost full");
/// assert!(logs.contains(Level::WARN, "almost full"));
/// ```
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
	let logs = CapturedLogs::default();
	let guard = tracing_subscriber::registry()
		.with(LogCapture { logs: logs.clone() })
		.set_default();
	(logs, guard)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_capture_records_level_and_message() {
		// Arrange
		let (logs, _guard) = capture_logs();

		// Act
		tracing::error!(code = 7, "render failed");
		tracing::debug!("noise");

		// Assert
		assert_eq!(logs.count(Level::ERROR, "render failed"), 1);
		assert!(!logs.contains(Level::ERROR, "noise"));
		assert_eq!(logs.events().len(), 2);
	}

	#[rstest]
	fn test_capture_stops_when_guard_drops() {
		let (logs, guard) = capture_logs();
		drop(guard);

		tracing::warn!("after drop");

		assert!(logs.events().is_empty());
	}
}
