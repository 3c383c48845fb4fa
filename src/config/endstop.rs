//! Homing endstop configuration.

use serde::Deserialize;

use super::units::MillimetersPerSec;

/// Homing switch placement and polarity.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EndstopConfig {
    /// Switch sits at the back (toward position 0) of the travel.
    #[serde(default = "default_home_to_back")]
    pub home_to_back: bool,

    /// Switch input reads low when triggered.
    #[serde(default = "default_active_low")]
    pub active_low: bool,

    /// Approach speed while seeking the switch.
    #[serde(rename = "homing_speed_mm_per_sec", default = "default_homing_speed")]
    pub homing_speed: MillimetersPerSec,
}

fn default_home_to_back() -> bool {
    true
}

fn default_active_low() -> bool {
    true
}

fn default_homing_speed() -> MillimetersPerSec {
    MillimetersPerSec(5.0)
}

impl Default for EndstopConfig {
    fn default() -> Self {
        Self {
            home_to_back: default_home_to_back(),
            active_low: default_active_low(),
            homing_speed: default_homing_speed(),
        }
    }
}

impl EndstopConfig {
    /// Direction of travel toward the switch, as a sign.
    #[inline]
    pub fn direction_toward_switch(&self) -> i8 {
        if self.home_to_back {
            -1
        } else {
            1
        }
    }
}
