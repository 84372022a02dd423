//! Configuration sources for the layered settings system
//!
//! Provides different sources of configuration that can be merged together
//! in priority order (environment variables > config files > defaults).
//!
//! Nested keys are represented as nested JSON objects. Environment variables
//! use a double underscore to separate nesting levels, so
//! `HOOKLOOP_EVENT_LOOP__SLOW_TASK_WARN_MS=10` becomes
//! `{"event_loop": {"slow_task_warn_ms": 10}}`.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Trait for configuration sources
pub trait ConfigSource {
	/// Load configuration from this source
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// Error type for configuration sources
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

/// Environment variable configuration source
///
/// Only variables starting with the configured prefix are loaded; the prefix
/// is stripped and the remainder lower-cased.
pub struct EnvSource {
	prefix: String,
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	/// Create a source reading process environment variables with `prefix`
	///
	/// # Examples
	///
	/// ```
	/// use hookloop_conf::EnvSource;
	///
	/// let source = EnvSource::new("APP_");
	/// ```
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			vars: None,
		}
	}

	/// Create a source with the standard `HOOKLOOP_` prefix
	pub fn hookloop() -> Self {
		Self::new(crate::ENV_PREFIX)
	}

	/// Read from a fixed set of variables instead of the process environment
	///
	/// # Examples
	///
	/// ```
	/// use hookloop_conf::{ConfigSource, EnvSource};
	///
	/// let source = EnvSource::hookloop()
	///     .with_vars([("HOOKLOOP_SCHEDULER__MAX_RENDER_PASSES", "3")]);
	/// let loaded = source.load().unwrap();
	/// assert_eq!(loaded["scheduler"]["max_render_passes"], 3);
	/// ```
	pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.vars = Some(
			vars.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		);
		self
	}

	fn parse_value(raw: &str) -> Value {
		let trimmed = raw.trim();
		if let Ok(num) = trimmed.parse::<i64>() {
			return Value::Number(num.into());
		}
		match trimmed.to_lowercase().as_str() {
			"true" | "yes" | "on" => Value::Bool(true),
			"false" | "no" | "off" => Value::Bool(false),
			_ => Value::String(raw.to_string()),
		}
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let vars: Vec<(String, String)> = match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		};

		let mut root = Map::new();
		for (key, value) in vars {
			let Some(stripped) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			let path: Vec<String> = stripped
				.split("__")
				.filter(|segment| !segment.is_empty())
				.map(str::to_lowercase)
				.collect();
			if path.is_empty() {
				continue;
			}
			insert_path(&mut root, &path, Self::parse_value(&value))?;
		}

		Ok(root.into_iter().collect())
	}

	fn priority(&self) -> u8 {
		100 // Highest priority
	}

	fn description(&self) -> String {
		format!("Environment variables (prefix: {})", self.prefix)
	}
}

fn insert_path(map: &mut Map<String, Value>, path: &[String], value: Value) -> Result<(), SourceError> {
	let (head, rest) = match path.split_first() {
		Some(split) => split,
		None => return Ok(()),
	};
	if rest.is_empty() {
		map.insert(head.clone(), value);
		return Ok(());
	}
	let child = map
		.entry(head.clone())
		.or_insert_with(|| Value::Object(Map::new()));
	match child {
		Value::Object(inner) => insert_path(inner, rest, value),
		_ => Err(SourceError::Parse(format!(
			"key '{}' is both a value and a table",
			head
		))),
	}
}

/// TOML file configuration source
///
/// A missing file loads as an empty configuration.
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	/// Create a new TOML file configuration source
	///
	/// # Examples
	///
	/// ```
	/// use hookloop_conf::TomlFileSource;
	/// use std::path::PathBuf;
	///
	/// let source = TomlFileSource::new(PathBuf::from("hookloop.toml"));
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		if !self.path.exists() {
			tracing::debug!(path = %self.path.display(), "settings file not found, skipping");
			return Ok(IndexMap::new());
		}

		let content = fs::read_to_string(&self.path)?;
		let toml_value: toml::Value = toml::from_str(&content)?;
		let json_value = serde_json::to_value(&toml_value)?;

		let map = json_value
			.as_object()
			.ok_or_else(|| SourceError::Parse("Expected table at root".to_string()))?;

		Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
	}

	fn priority(&self) -> u8 {
		50 // Medium priority
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Default values configuration source
pub struct DefaultSource {
	values: IndexMap<String, Value>,
}

impl DefaultSource {
	/// Create an empty default values source
	pub fn new() -> Self {
		Self {
			values: IndexMap::new(),
		}
	}

	/// Add a default value for a top-level configuration key
	///
	/// # Examples
	///
	/// ```
	/// use hookloop_conf::DefaultSource;
	/// use serde_json::json;
	///
	/// let source = DefaultSource::new()
	///     .with_value("event_loop", json!({ "slow_task_warn_ms": 5 }));
	/// ```
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}
}

impl Default for DefaultSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		0 // Lowest priority
	}

	fn description(&self) -> String {
		"Default values".to_string()
	}
}

/// Deep-merge `overlay` into `base`; overlay wins on conflicting leaves
pub(crate) fn merge_into(base: &mut Map<String, Value>, overlay: IndexMap<String, Value>) {
	for (key, value) in overlay {
		match (base.get_mut(&key), value) {
			(Some(Value::Object(existing)), Value::Object(incoming)) => {
				merge_into(existing, incoming.into_iter().collect());
			}
			(_, value) => {
				base.insert(key, value);
			}
		}
	}
}
