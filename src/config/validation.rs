//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::pattern::PatternKind;

use super::MachineConfig;

/// Validate a machine configuration.
///
/// Checks:
/// - Steps per millimeter, speed, acceleration and deceleration are > 0
/// - Usable travel is > 0 after removing both keepouts
/// - Homing speed is > 0 when an endstop is configured
/// - The startup pattern exists in the catalogue
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    validate_motor(&config.motor)?;

    let travel = &config.travel;
    if !(travel.keepout.0 >= 0.0 && travel.usable_travel().0 > 0.0) {
        error!("travel leaves no usable range");
        return Err(Error::Config(ConfigError::InvalidTravel {
            physical: travel.physical_travel.0,
            keepout: travel.keepout.0,
        }));
    }

    if let Some(endstop) = config.endstop {
        if !is_positive(endstop.homing_speed.0) {
            return Err(Error::Config(ConfigError::InvalidHomingSpeed(
                endstop.homing_speed.0,
            )));
        }
    }

    if PatternKind::index_of(config.startup.pattern.as_str()).is_none() {
        return Err(Error::Config(ConfigError::UnknownPattern(
            config.startup.pattern.clone(),
        )));
    }

    Ok(())
}

fn validate_motor(motor: &super::MotorConfig) -> Result<()> {
    if !is_positive(motor.steps_per_mm) {
        return Err(Error::Config(ConfigError::InvalidStepsPerMillimeter(
            motor.steps_per_mm,
        )));
    }

    if !is_positive(motor.max_speed.0) {
        return Err(Error::Config(ConfigError::InvalidMaxSpeed(motor.max_speed.0)));
    }

    if !is_positive(motor.max_acceleration.0) {
        return Err(Error::Config(ConfigError::InvalidMaxAcceleration(
            motor.max_acceleration.0,
        )));
    }

    let decel = motor.effective_max_deceleration().0;
    if !is_positive(decel) {
        return Err(Error::Config(ConfigError::InvalidMaxDeceleration(decel)));
    }

    Ok(())
}

// NaN fails this check too.
fn is_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}
