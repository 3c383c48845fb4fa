//! Observable axis state.

use crate::motion::{Direction, MotionPhase};

/// Which limit switch has been reported as triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LimitSwitch {
    /// Switch at the home end of the travel.
    Begin,
    /// Switch at the far end of the travel.
    End,
    /// One switch wired for both ends; the forbidden direction is the one
    /// the axis was commanded to travel in when it triggered.
    CombinedBeginAndEnd,
}

/// Snapshot of everything the axis knows about its own motion.
///
/// Owned by the axis controller and mutated only by step processing and
/// the controller's own setters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisState {
    /// Current position in steps.
    pub position: i64,
    /// Target position in steps.
    pub target: i64,
    /// Direction of motion.
    pub direction: Direction,
    /// Period of the last step in µs (0 at rest).
    pub current_period_us: f32,
    /// Period until the next step in µs (0 at rest).
    pub next_period_us: f32,
    /// Motion phase.
    pub phase: MotionPhase,
    /// A homing procedure has succeeded.
    pub homed: bool,
    /// Limit switch currently reported as active.
    pub active_limit: Option<LimitSwitch>,
    /// Direction the active limit switch forbids.
    pub disallowed_direction: Direction,
}

impl Default for AxisState {
    fn default() -> Self {
        Self {
            position: 0,
            target: 0,
            direction: Direction::Stopped,
            current_period_us: 0.0,
            next_period_us: 0.0,
            phase: MotionPhase::Stopped,
            homed: false,
            active_limit: None,
            disallowed_direction: Direction::Stopped,
        }
    }
}

impl AxisState {
    /// Signed steps from the current position to the target.
    #[inline]
    pub fn distance_to_target(&self) -> i64 {
        self.target - self.position
    }

    /// At rest on the target.
    #[inline]
    pub fn motion_complete(&self) -> bool {
        self.direction == Direction::Stopped && self.position == self.target
    }

    /// Signed velocity in steps/s derived from the last step period.
    pub fn velocity(&self) -> f32 {
        if self.current_period_us > 0.0 {
            self.direction.sign() as f32 * 1_000_000.0 / self.current_period_us
        } else {
            0.0
        }
    }

    /// Zero all motion and pin the target to the current position.
    pub(crate) fn halt(&mut self) {
        self.current_period_us = 0.0;
        self.next_period_us = 0.0;
        self.direction = Direction::Stopped;
        self.phase = MotionPhase::Stopped;
        self.target = self.position;
    }
}

/// Notifications raised by the axis, drained by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisEvent {
    /// Arrived on a freshly set target. Raised once per arrival.
    TargetReached(i64),
    /// A limit switch was reported.
    LimitTriggered,
    /// A seek toward home ended on the home limit switch.
    HomeReached,
    /// An emergency stop was requested.
    EmergencyStopTriggered,
    /// A holding emergency stop was released.
    EmergencyStopReleased,
}
