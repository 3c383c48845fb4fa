//! Machine configuration - root configuration structure.

use heapless::String;
use serde::Deserialize;

use super::brake::BrakeConfig;
use super::endstop::EndstopConfig;
use super::limits::MotionLimits;
use super::motor::MotorConfig;
use super::travel::TravelConfig;
use super::units::Millimeters;

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Drive-side motor settings.
    pub motor: MotorConfig,

    /// Mechanical travel.
    pub travel: TravelConfig,

    /// Optional holding brake.
    #[serde(default)]
    pub brake: Option<BrakeConfig>,

    /// Optional homing endstop.
    #[serde(default)]
    pub endstop: Option<EndstopConfig>,

    /// Initial pattern parameters.
    #[serde(default)]
    pub startup: StartupConfig,
}

impl MachineConfig {
    /// Derive the step-domain motion envelope.
    pub fn limits(&self) -> MotionLimits {
        MotionLimits::from_config(&self.motor, &self.travel)
    }
}

/// Pattern selection and parameters applied when a session is created.
#[derive(Debug, Clone, Deserialize)]
pub struct StartupConfig {
    /// Catalogue name of the initial pattern.
    #[serde(default = "default_pattern")]
    pub pattern: String<32>,

    /// Initial speed in strokes per minute.
    #[serde(default = "default_speed")]
    pub speed_strokes_per_minute: f32,

    /// Initial depth; the full usable travel when omitted.
    #[serde(default, rename = "depth_mm")]
    pub depth: Option<Millimeters>,

    /// Initial stroke length; a third of the usable travel when omitted.
    #[serde(default, rename = "stroke_mm")]
    pub stroke: Option<Millimeters>,

    /// Initial sensation (-100..100).
    #[serde(default)]
    pub sensation: f32,

    /// Seed for patterns that use bounded randomness.
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

fn default_pattern() -> String<32> {
    crate::error::bounded("Simple Stroke")
}

fn default_speed() -> f32 {
    60.0
}

fn default_seed() -> u64 {
    0x5EED_0F_5717_0CE5
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            speed_strokes_per_minute: default_speed(),
            depth: None,
            stroke: None,
            sensation: 0.0,
            random_seed: default_seed(),
        }
    }
}
