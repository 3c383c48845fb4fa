//! Optional holding-brake configuration.

use serde::Deserialize;

/// Brake output polarity and timing.
///
/// The brake engages `engage_delay_ms` after the last step when the axis
/// comes to rest, and releases `release_delay_ms` after the last step if set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct BrakeConfig {
    /// Brake is engaged by driving its output low.
    #[serde(default)]
    pub active_low: bool,

    /// Delay before engaging once motion has stopped (0 engages at once).
    #[serde(default)]
    pub engage_delay_ms: u64,

    /// Optional delay after which an engaged brake is released again.
    #[serde(default)]
    pub release_delay_ms: Option<u64>,
}
