//! Unit tests for TOML configuration parsing.

use stroke_motion::config::{load_config, MachineConfig};

/// Test parsing a machine with only the required sections.
#[test]
fn test_parse_minimal_machine() {
    let toml_str = r#"
[motor]
steps_per_mm = 50.0
max_speed_mm_per_sec = 900.0
max_acceleration_mm_per_sec2 = 10000.0

[travel]
physical_travel_mm = 160.0
keepout_mm = 5.0
"#;

    let config: MachineConfig = toml::from_str(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.motor.steps_per_mm, 50.0);
    assert_eq!(config.motor.max_speed.0, 900.0);
    assert_eq!(config.motor.effective_max_deceleration().0, 10000.0);
    assert!(!config.motor.invert_direction);
    assert!(config.motor.enable_active_low);
    assert_eq!(config.travel.usable_travel().0, 150.0);
    assert!(config.brake.is_none());
    assert!(config.endstop.is_none());
}

/// Test the startup section falls back to its defaults.
#[test]
fn test_startup_defaults() {
    let toml_str = r#"
[motor]
steps_per_mm = 50.0
max_speed_mm_per_sec = 900.0
max_acceleration_mm_per_sec2 = 10000.0

[travel]
physical_travel_mm = 160.0
keepout_mm = 5.0

[startup]
depth_mm = 100.0
"#;

    let config: MachineConfig = toml::from_str(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.startup.pattern.as_str(), "Simple Stroke");
    assert_eq!(config.startup.speed_strokes_per_minute, 60.0);
    assert_eq!(config.startup.depth.map(|d| d.0), Some(100.0));
    assert!(config.startup.stroke.is_none());
    assert_eq!(config.startup.sensation, 0.0);
}

/// Test the endstop and brake sections.
#[test]
fn test_parse_endstop_and_brake() {
    let toml_str = r#"
[motor]
steps_per_mm = 50.0
max_speed_mm_per_sec = 900.0
max_acceleration_mm_per_sec2 = 10000.0
max_deceleration_mm_per_sec2 = 6000.0

[travel]
physical_travel_mm = 160.0
keepout_mm = 5.0

[endstop]
home_to_back = false
active_low = false
homing_speed_mm_per_sec = 8.0

[brake]
engage_delay_ms = 250
"#;

    let config: MachineConfig = toml::from_str(toml_str).expect("Failed to parse TOML");

    let endstop = config.endstop.expect("Endstop not found");
    assert!(!endstop.home_to_back);
    assert!(!endstop.active_low);
    assert_eq!(endstop.homing_speed.0, 8.0);
    assert_eq!(endstop.direction_toward_switch(), 1);

    let brake = config.brake.expect("Brake not found");
    assert!(!brake.active_low);
    assert_eq!(brake.engage_delay_ms, 250);
    assert_eq!(brake.release_delay_ms, None);

    assert_eq!(config.motor.effective_max_deceleration().0, 6000.0);
}

/// Test the step-domain envelope derived from the configuration.
#[test]
fn test_limits_from_config() {
    let toml_str = r#"
[motor]
steps_per_mm = 50.0
max_speed_mm_per_sec = 900.0
max_acceleration_mm_per_sec2 = 10000.0

[travel]
physical_travel_mm = 160.0
keepout_mm = 5.0
"#;

    let config: MachineConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let limits = config.limits();

    assert_eq!(limits.min_step, 0);
    assert_eq!(limits.max_step, 7500);
    assert_eq!(limits.keepout_steps, 250);
    assert_eq!(limits.physical_travel_steps, 8000);
    assert_eq!(limits.max_step_per_second, 45_000.0);
    assert_eq!(limits.max_step_acceleration, 500_000.0);
    assert_eq!(limits.clamp_position(-10), 0);
    assert_eq!(limits.clamp_position(9000), 7500);
}

/// Test loading a configuration file from disk.
#[test]
fn test_load_config_from_file() {
    let path = std::env::temp_dir().join(format!("stroke-motion-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        r#"
[motor]
steps_per_mm = 50.0
max_speed_mm_per_sec = 900.0
max_acceleration_mm_per_sec2 = 10000.0

[travel]
physical_travel_mm = 160.0
keepout_mm = 5.0

[startup]
pattern = "Insist"
"#,
    )
    .expect("Failed to write config");

    let config = load_config(&path).expect("Failed to load config");
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.startup.pattern.as_str(), "Insist");
}

/// Test a missing file reports an I/O error.
#[test]
fn test_load_missing_file() {
    let result = load_config("/nonexistent/stroke-motion.toml");
    assert!(matches!(
        result,
        Err(stroke_motion::Error::Config(stroke_motion::ConfigError::IoError(_)))
    ));
}
