//! Step-domain motion envelope derived from configuration.

use libm::roundf;

use super::motor::MotorConfig;
use super::travel::TravelConfig;
use super::units::{Millimeters, Steps};

/// Motion limits in steps, computed once at configuration time.
///
/// Position 0 is the inner edge of the back keepout; `max_step` is the inner
/// edge of the front keepout. Changing the configuration means re-deriving
/// the whole envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionLimits {
    /// Steps per millimeter of travel.
    pub steps_per_mm: f32,

    /// Lowest legal position.
    pub min_step: i64,

    /// Highest legal position.
    pub max_step: i64,

    /// Maximum speed in steps per second.
    pub max_step_per_second: f32,

    /// Maximum acceleration in steps per second squared.
    pub max_step_acceleration: f32,

    /// Maximum deceleration in steps per second squared.
    pub max_step_deceleration: f32,

    /// Keepout boundary in steps.
    pub keepout_steps: i64,

    /// Physical travel in steps (hard stop to hard stop).
    pub physical_travel_steps: i64,
}

impl MotionLimits {
    /// Derive the envelope from motor and travel configuration.
    pub fn from_config(motor: &MotorConfig, travel: &TravelConfig) -> Self {
        let spm = motor.steps_per_mm;
        Self {
            steps_per_mm: spm,
            min_step: 0,
            max_step: roundf(travel.usable_travel().0 * spm) as i64,
            max_step_per_second: roundf(motor.max_speed.0 * spm),
            max_step_acceleration: roundf(motor.max_acceleration.0 * spm),
            max_step_deceleration: roundf(motor.effective_max_deceleration().0 * spm),
            keepout_steps: roundf(travel.keepout.0 * spm) as i64,
            physical_travel_steps: roundf(travel.physical_travel.0 * spm) as i64,
        }
    }

    /// Clamp a position into `[min_step, max_step]`.
    #[inline]
    pub fn clamp_position(&self, steps: i64) -> i64 {
        steps.clamp(self.min_step, self.max_step)
    }

    /// Check if a position is within limits.
    #[inline]
    pub fn contains(&self, steps: i64) -> bool {
        steps >= self.min_step && steps <= self.max_step
    }

    /// Convert millimeters to steps, truncating like the setters do.
    #[inline]
    pub fn to_steps(&self, mm: f32) -> i64 {
        Millimeters(mm).to_steps(self.steps_per_mm).0
    }

    /// Convert steps to millimeters.
    #[inline]
    pub fn to_millimeters(&self, steps: i64) -> f32 {
        Steps(steps).to_millimeters(self.steps_per_mm).0
    }

    /// Usable travel in millimeters.
    #[inline]
    pub fn travel_mm(&self) -> f32 {
        self.to_millimeters(self.max_step - self.min_step)
    }
}
