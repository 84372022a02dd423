//! # hookloop-conf
//!
//! Layered runtime settings for the hookloop event loop and render scheduler.
//!
//! Settings are assembled from several [`ConfigSource`]s, merged in priority
//! order (environment variables > TOML file > defaults) and deserialised into
//! [`RuntimeSettings`].
//!
//! ## Example
//!
//! ```
//! use hookloop_conf::{DefaultSource, SettingsBuilder};
//! use serde_json::json;
//!
//! let settings = SettingsBuilder::new()
//!     .add_source(DefaultSource::new().with_value("scheduler", json!({ "max_render_passes": 8 })))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(settings.scheduler.max_render_passes, 8);
//! assert_eq!(settings.event_loop.slow_task_warn_ms, 50);
//! ```

pub mod settings;
pub mod sources;

pub use settings::{
	LoopSettings, RejectionPolicy, RuntimeSettings, SchedulerSettings, SettingsBuilder,
	SettingsError,
};
pub use sources::{ConfigSource, DefaultSource, EnvSource, SourceError, TomlFileSource};

/// Prefix used by [`EnvSource::hookloop`] and [`SettingsBuilder::with_standard_sources`].
pub const ENV_PREFIX: &str = "HOOKLOOP_";
