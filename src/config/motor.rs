//! Motor configuration from TOML.

use serde::Deserialize;

use super::units::{MillimetersPerSec, MillimetersPerSecSquared};

/// Drive-side motor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MotorConfig {
    /// Steps per millimeter of linear travel (microsteps and pulley included).
    pub steps_per_mm: f32,

    /// Maximum linear speed in millimeters per second.
    #[serde(rename = "max_speed_mm_per_sec")]
    pub max_speed: MillimetersPerSec,

    /// Maximum linear acceleration in millimeters per second squared.
    #[serde(rename = "max_acceleration_mm_per_sec2")]
    pub max_acceleration: MillimetersPerSecSquared,

    /// Maximum deceleration; defaults to `max_acceleration` when omitted.
    #[serde(default, rename = "max_deceleration_mm_per_sec2")]
    pub max_deceleration: Option<MillimetersPerSecSquared>,

    /// Invert direction pin logic.
    #[serde(default)]
    pub invert_direction: bool,

    /// Driver enable input is active low (most step/dir drivers).
    #[serde(default = "default_enable_active_low")]
    pub enable_active_low: bool,
}

fn default_enable_active_low() -> bool {
    true
}

impl MotorConfig {
    /// Deceleration limit, falling back to the acceleration limit.
    pub fn effective_max_deceleration(&self) -> MillimetersPerSecSquared {
        self.max_deceleration.unwrap_or(self.max_acceleration)
    }
}
