//! Unit tests for configuration validation.

use stroke_motion::config::{parse_config, validate_config, MachineConfig};
use stroke_motion::error::{ConfigError, Error};

const VALID: &str = r#"
[motor]
steps_per_mm = 50.0
max_speed_mm_per_sec = 900.0
max_acceleration_mm_per_sec2 = 10000.0

[travel]
physical_travel_mm = 160.0
keepout_mm = 5.0

[endstop]
homing_speed_mm_per_sec = 5.0
"#;

fn valid() -> MachineConfig {
    toml::from_str(VALID).expect("Failed to parse TOML")
}

/// Test validation of a valid configuration.
#[test]
fn test_valid_config_passes_validation() {
    assert!(validate_config(&valid()).is_ok());
    assert!(parse_config(VALID).is_ok());
}

/// Test zero steps per millimeter is rejected.
#[test]
fn test_zero_steps_per_mm() {
    let mut config = valid();
    config.motor.steps_per_mm = 0.0;
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidStepsPerMillimeter(0.0)))
    );
}

/// Test negative speed and NaN acceleration are rejected.
#[test]
fn test_invalid_rates() {
    let mut config = valid();
    config.motor.max_speed.0 = -1.0;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidMaxSpeed(_)))
    ));

    let mut config = valid();
    config.motor.max_acceleration.0 = f32::NAN;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidMaxAcceleration(_)))
    ));
}

/// Test keepouts that eat the whole travel are rejected.
#[test]
fn test_keepout_larger_than_travel() {
    let mut config = valid();
    config.travel.keepout.0 = 80.0;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidTravel { .. }))
    ));
}

/// Test a zero homing speed is rejected.
#[test]
fn test_zero_homing_speed() {
    let mut config = valid();
    if let Some(endstop) = config.endstop.as_mut() {
        endstop.homing_speed.0 = 0.0;
    }
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidHomingSpeed(_)))
    ));
}

/// Test an unknown startup pattern fails parsing.
#[test]
fn test_unknown_startup_pattern() {
    let toml_str = format!("{}\n[startup]\npattern = \"Jackhammer\"\n", VALID);
    assert!(matches!(
        parse_config(&toml_str),
        Err(Error::Config(ConfigError::UnknownPattern(_)))
    ));
}

/// Test malformed TOML reports a parse error.
#[test]
fn test_parse_error() {
    assert!(matches!(
        parse_config("[motor\nsteps_per_mm = "),
        Err(Error::Config(ConfigError::ParseError(_)))
    ));
}
