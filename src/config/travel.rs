//! Mechanical travel of the linear axis.

use serde::Deserialize;

use super::units::Millimeters;

/// Physical travel and the safety keepout applied at both ends.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TravelConfig {
    /// Distance between the mechanical hard stops.
    #[serde(rename = "physical_travel_mm")]
    pub physical_travel: Millimeters,

    /// Safety margin subtracted from each end of the physical travel.
    #[serde(rename = "keepout_mm")]
    pub keepout: Millimeters,
}

impl TravelConfig {
    /// Usable travel: physical travel minus a keepout at each end.
    #[inline]
    pub fn usable_travel(&self) -> Millimeters {
        self.physical_travel - self.keepout * 2.0
    }
}
