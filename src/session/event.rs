//! Notifications delivered to the session owner.

/// Everything the session reports, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// A motion command was committed to the axis.
    Telemetry {
        /// Target position in mm.
        position_mm: f32,
        /// Commanded speed in mm/s.
        speed_mm_per_sec: f32,
        /// Speed or acceleration was reduced to the machine limits.
        clipped: bool,
    },
    /// Homing finished. `false` leaves the session un-homed.
    HomingComplete(bool),
    /// The axis arrived on a freshly commanded target (steps).
    TargetReached(i64),
    /// A limit switch stopped or constrained the axis.
    LimitTriggered,
    /// An emergency stop was applied to the axis.
    EmergencyStopTriggered,
    /// A holding emergency stop was released.
    EmergencyStopReleased,
}
