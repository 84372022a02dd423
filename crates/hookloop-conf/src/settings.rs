//! Runtime settings and the layered settings builder

use crate::sources::{ConfigSource, EnvSource, SourceError, TomlFileSource, merge_into};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Error raised while assembling [`RuntimeSettings`]
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("failed to load {source_name}: {error}")]
	Source {
		source_name: String,
		#[source]
		error: SourceError,
	},

	#[error("failed to deserialize settings: {0}")]
	Deserialize(#[from] serde_json::Error),

	#[error("Invalid value for '{key}': {message}")]
	InvalidValue { key: String, message: String },
}

/// How the event loop treats a rejection nobody handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
	/// Log and hand the rejection to the registered reporter; the loop keeps running.
	#[default]
	Report,
	/// Report, then make the current loop turn fail with an error.
	Strict,
}

/// Event loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
	/// Number of microtasks in a single checkpoint after which a starvation warning is logged.
	pub microtask_warn_threshold: usize,
	/// A task running longer than this many milliseconds is logged as blocking the loop.
	pub slow_task_warn_ms: u64,
	/// Policy for unhandled promise rejections.
	pub rejection_policy: RejectionPolicy,
}

impl Default for LoopSettings {
	fn default() -> Self {
		Self {
			microtask_warn_threshold: 10_000,
			slow_task_warn_ms: 50,
			rejection_policy: RejectionPolicy::Report,
		}
	}
}

/// Render scheduler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
	/// Maximum length of a chain of drains each triggered by the previous one.
	///
	/// The cap counts passes, not progress: a chain that would settle after
	/// more passes than this is still stopped, and the instances dirty at that
	/// point fail with `RenderLoopLimit`.
	pub max_render_passes: u32,
	/// Require every render to call the same number of hooks.
	///
	/// Kind and state type mismatches are reported either way.
	pub validate_hook_shape: bool,
}

impl Default for SchedulerSettings {
	fn default() -> Self {
		Self {
			max_render_passes: 50,
			validate_hook_shape: true,
		}
	}
}

/// Complete runtime settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
	pub event_loop: LoopSettings,
	pub scheduler: SchedulerSettings,
}

impl RuntimeSettings {
	/// Check value constraints that serde cannot express
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.scheduler.max_render_passes == 0 {
			return Err(SettingsError::InvalidValue {
				key: "scheduler.max_render_passes".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		if self.event_loop.microtask_warn_threshold == 0 {
			return Err(SettingsError::InvalidValue {
				key: "event_loop.microtask_warn_threshold".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		Ok(())
	}
}

/// Builder merging [`ConfigSource`]s into [`RuntimeSettings`]
///
/// # Examples
///
/// ```
/// use hookloop_conf::{EnvSource, RejectionPolicy, SettingsBuilder};
///
/// let settings = SettingsBuilder::new()
///     .add_source(EnvSource::hookloop().with_vars([
///         ("HOOKLOOP_EVENT_LOOP__REJECTION_POLICY", "strict"),
///     ]))
///     .build()
///     .unwrap();
///
/// assert_eq!(settings.event_loop.rejection_policy, RejectionPolicy::Strict);
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a configuration source
	pub fn add_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Add the TOML file at `path` and the `HOOKLOOP_` environment
	pub fn with_standard_sources(self, path: impl Into<PathBuf>) -> Self {
		self.add_source(TomlFileSource::new(path))
			.add_source(EnvSource::hookloop())
	}

	/// Merge every source by ascending priority and deserialize
	pub fn build(mut self) -> Result<RuntimeSettings, SettingsError> {
		// Stable sort: equal priorities keep insertion order.
		self.sources.sort_by_key(|source| source.priority());

		let mut merged = Map::new();
		for source in &self.sources {
			let loaded = source.load().map_err(|error| SettingsError::Source {
				source_name: source.description(),
				error,
			})?;
			tracing::debug!(source = %source.description(), keys = loaded.len(), "loaded settings source");
			merge_into(&mut merged, loaded);
		}

		let settings: RuntimeSettings = serde_json::from_value(Value::Object(merged))?;
		settings.validate()?;
		Ok(settings)
	}
}
