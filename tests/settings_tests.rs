//! Runtime configuration from a TOML file and the process environment

use std::io::Write;

use hookloop::{NullRenderer, RejectionPolicy, Runtime, RuntimeError, SettingsError};
use rstest::rstest;
use serial_test::serial;
use tempfile::NamedTempFile;

const PASSES_VAR: &str = "HOOKLOOP_SCHEDULER__MAX_RENDER_PASSES";

fn config_file(contents: &str) -> NamedTempFile {
	let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
	file.write_all(contents.as_bytes()).unwrap();
	file
}

#[rstest]
#[serial(hookloop_env)]
fn test_runtime_reads_toml_file() {
	// Arrange
	let file = config_file(
		r#"
[event_loop]
rejection_policy = "strict"
slow_task_warn_ms = 5

[scheduler]
max_render_passes = 12
"#,
	);

	// Act
	let runtime = Runtime::<()>::from_config_file(file.path(), NullRenderer).unwrap();

	// Assert
	let settings = runtime.settings();
	assert_eq!(settings.event_loop.rejection_policy, RejectionPolicy::Strict);
	assert_eq!(settings.event_loop.slow_task_warn_ms, 5);
	assert_eq!(settings.event_loop.microtask_warn_threshold, 10_000);
	assert_eq!(settings.scheduler.max_render_passes, 12);
	assert_eq!(runtime.scheduler().settings().max_render_passes, 12);
}

#[rstest]
#[serial(hookloop_env)]
fn test_environment_overrides_toml_file() {
	// Arrange
	let file = config_file("[scheduler]\nmax_render_passes = 12\n");
	// SAFETY: serialised with every other test touching the environment
	unsafe { std::env::set_var(PASSES_VAR, "3") };

	// Act
	let result = Runtime::<()>::from_config_file(file.path(), NullRenderer);
	unsafe { std::env::remove_var(PASSES_VAR) };

	// Assert
	assert_eq!(result.unwrap().settings().scheduler.max_render_passes, 3);
}

#[rstest]
#[serial(hookloop_env)]
fn test_missing_file_falls_back_to_defaults() {
	let dir = tempfile::tempdir().unwrap();

	let runtime = Runtime::<()>::from_config_file(dir.path().join("absent.toml"), NullRenderer).unwrap();

	assert_eq!(runtime.settings().scheduler.max_render_passes, 50);
}

#[rstest]
#[serial(hookloop_env)]
fn test_invalid_value_is_reported() {
	let file = config_file("[scheduler]\nmax_render_passes = 0\n");

	let result = Runtime::<()>::from_config_file(file.path(), NullRenderer);

	assert!(matches!(
		result,
		Err(RuntimeError::Settings(SettingsError::InvalidValue { ref key, .. })) if key == "scheduler.max_render_passes"
	));
}
