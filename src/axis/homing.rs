//! Double-touch homing against a switch.
//!
//! The axis approaches the switch, backs off until it releases, then
//! re-approaches at an eighth of the speed so the final trigger point is
//! repeatable. The procedure is a state machine advanced by
//! [`HomingProcedure::poll`], one axis tick per call, so whoever drives it can
//! interleave other work (an emergency stop in particular).

use embedded_hal::digital::OutputPin;

use crate::error::AxisError;
use crate::motion::Direction;

use super::controller::AxisController;
use super::hal::{Clock, HomeSwitch};

/// Pause after each phase of the homing sequence.
pub const HOMING_SETTLE_MS: u64 = 25;

/// The re-approach runs at the homing speed divided by this.
pub const REAPPROACH_SPEED_DIVISOR: f32 = 8.0;

/// Outcome of one [`HomingProcedure::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingStatus {
    /// Still running; poll again.
    InProgress,
    /// Position 0 is now the switch trigger point.
    Succeeded,
    /// The switch was not found within the allowed distance, or the
    /// procedure was interrupted.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Approach,
    BackOff,
    Reapproach,
    Settle { until_ms: u64, then: Next },
    Done(HomingStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    BackOff,
    Reapproach,
    Finish,
}

/// Non-blocking homing sequence.
#[derive(Debug, Clone)]
pub struct HomingProcedure {
    direction: Direction,
    speed: f32,
    max_distance: i64,
    original_speed: f32,
    phase: Phase,
}

impl HomingProcedure {
    /// Prepare a homing run.
    ///
    /// # Arguments
    ///
    /// * `direction` - Direction in which the switch lies
    /// * `speed` - Approach speed in steps/s
    /// * `max_distance` - Steps to travel in each phase before giving up
    ///
    /// # Errors
    ///
    /// Returns an error if the speed is not positive. A `Stopped` direction
    /// is accepted and fails on the first poll.
    pub fn new(direction: Direction, speed: f32, max_distance: i64) -> Result<Self, AxisError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(AxisError::InvalidSpeed(speed));
        }
        Ok(Self {
            direction,
            speed,
            max_distance: max_distance.abs(),
            original_speed: speed,
            phase: Phase::Start,
        })
    }

    /// Check if the procedure has finished, successfully or not.
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done(_))
    }

    /// Advance the procedure by one step.
    ///
    /// # Errors
    ///
    /// Returns an error if an output pin or the switch cannot be accessed.
    pub fn poll<STEP, DIR, EN, BRK, CLK, SW>(
        &mut self,
        axis: &mut AxisController<STEP, DIR, EN, BRK, CLK>,
        switch: &mut SW,
    ) -> Result<HomingStatus, AxisError>
    where
        STEP: OutputPin,
        DIR: OutputPin,
        EN: OutputPin,
        BRK: OutputPin,
        CLK: Clock,
        SW: HomeSwitch,
    {
        let travel = self.direction.sign() * self.max_distance;

        match self.phase {
            Phase::Done(status) => return Ok(status),

            Phase::Start => {
                if !self.direction.is_moving() || axis.emergency_stop_active() {
                    return self.finish(axis, HomingStatus::Failed);
                }
                self.original_speed = axis.timing().speed();
                info!("homing toward {} at {} steps/s", self.direction.sign(), self.speed);
                if switch.is_triggered(axis.state())? {
                    self.settle(axis, Next::BackOff);
                } else {
                    axis.set_speed(self.speed)?;
                    axis.set_target_relative(travel);
                    self.phase = Phase::Approach;
                }
            }

            Phase::Approach => {
                if axis.process_tick()? {
                    warn!("homing switch not found");
                    return self.finish(axis, HomingStatus::Failed);
                }
                if switch.is_triggered(axis.state())? {
                    axis.halt();
                    axis.note_limit_triggered();
                    self.settle(axis, Next::BackOff);
                }
            }

            Phase::BackOff => {
                if axis.process_tick()? {
                    warn!("homing switch did not release");
                    return self.finish(axis, HomingStatus::Failed);
                }
                if !switch.is_triggered(axis.state())? {
                    axis.halt();
                    self.settle(axis, Next::Reapproach);
                }
            }

            Phase::Reapproach => {
                if axis.process_tick()? {
                    warn!("homing switch lost on re-approach");
                    return self.finish(axis, HomingStatus::Failed);
                }
                if switch.is_triggered(axis.state())? {
                    axis.halt();
                    self.settle(axis, Next::Finish);
                }
            }

            Phase::Settle { until_ms, then } => {
                if axis.emergency_stop_active() {
                    return self.finish(axis, HomingStatus::Failed);
                }
                if axis.now_millis() >= until_ms {
                    match then {
                        Next::BackOff => {
                            axis.set_target_relative(-travel);
                            self.phase = Phase::BackOff;
                        }
                        Next::Reapproach => {
                            axis.set_speed(self.speed / REAPPROACH_SPEED_DIVISOR)?;
                            axis.set_target_relative(travel);
                            self.phase = Phase::Reapproach;
                        }
                        Next::Finish => {
                            axis.set_current_position_as_home_and_stop();
                            info!("homing complete");
                            return self.finish(axis, HomingStatus::Succeeded);
                        }
                    }
                }
            }
        }

        Ok(HomingStatus::InProgress)
    }

    fn settle<STEP, DIR, EN, BRK, CLK>(&mut self, axis: &AxisController<STEP, DIR, EN, BRK, CLK>, then: Next)
    where
        STEP: OutputPin,
        DIR: OutputPin,
        EN: OutputPin,
        BRK: OutputPin,
        CLK: Clock,
    {
        self.phase = Phase::Settle {
            until_ms: axis.now_millis() + HOMING_SETTLE_MS,
            then,
        };
    }

    fn finish<STEP, DIR, EN, BRK, CLK>(
        &mut self,
        axis: &mut AxisController<STEP, DIR, EN, BRK, CLK>,
        status: HomingStatus,
    ) -> Result<HomingStatus, AxisError>
    where
        STEP: OutputPin,
        DIR: OutputPin,
        EN: OutputPin,
        BRK: OutputPin,
        CLK: Clock,
    {
        if status == HomingStatus::Failed {
            axis.halt();
        }
        axis.set_speed(self.original_speed)?;
        self.phase = Phase::Done(status);
        Ok(status)
    }
}

impl<STEP, DIR, EN, BRK, CLK> AxisController<STEP, DIR, EN, BRK, CLK>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    BRK: OutputPin,
    CLK: Clock,
{
    /// Home against `switch`, blocking until the sequence ends.
    ///
    /// Returns `Ok(true)` with the position set to 0 on success and
    /// `Ok(false)` if the switch was not found within `max_distance` steps in
    /// any phase.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive speed or a pin failure.
    pub fn home_to_switch<SW: HomeSwitch>(
        &mut self,
        direction: Direction,
        speed: f32,
        max_distance: i64,
        mut switch: SW,
    ) -> Result<bool, AxisError> {
        let mut procedure = HomingProcedure::new(direction, speed, max_distance)?;
        loop {
            match procedure.poll(self, &mut switch)? {
                HomingStatus::InProgress => continue,
                HomingStatus::Succeeded => return Ok(true),
                HomingStatus::Failed => return Ok(false),
            }
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::axis::sim::{SimClock, SimPin};
    use crate::axis::{AxisControllerBuilder, AxisEvent, AxisState, NoPin, SwitchFn};

    fn sim_axis() -> AxisController<SimPin, SimPin, NoPin, NoPin, SimClock> {
        AxisControllerBuilder::new()
            .step_pin(SimPin::new())
            .dir_pin(SimPin::new())
            .clock(SimClock::new(100))
            .speed(1000.0)
            .acceleration(2000.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_double_touch_homing() {
        let mut axis = sim_axis();
        let switch = SwitchFn(|s: &AxisState| s.position <= -500 && s.direction == Direction::Negative);

        let homed = axis.home_to_switch(Direction::Negative, 25.0, 2000, switch).unwrap();

        assert!(homed);
        assert!(axis.is_homed());
        assert_eq!(axis.position(), 0);
        assert_eq!(axis.target(), 0);
        assert!(axis.motion_complete());
        assert_eq!(axis.timing().speed(), 1000.0);
        assert_eq!(axis.poll_event(), Some(AxisEvent::LimitTriggered));
    }

    #[test]
    fn test_switch_not_found() {
        let mut axis = sim_axis();
        let switch = SwitchFn(|_: &AxisState| false);

        let homed = axis.home_to_switch(Direction::Negative, 500.0, 100, switch).unwrap();

        assert!(!homed);
        assert!(!axis.is_homed());
        assert_eq!(axis.position(), -100);
        assert_eq!(axis.timing().speed(), 1000.0);
    }

    #[test]
    fn test_emergency_stop_aborts_homing() {
        let mut axis = sim_axis();
        let mut switch = SwitchFn(|_: &AxisState| false);
        let mut procedure = HomingProcedure::new(Direction::Negative, 500.0, 10_000).unwrap();

        for _ in 0..1000 {
            assert_eq!(procedure.poll(&mut axis, &mut switch).unwrap(), HomingStatus::InProgress);
        }
        axis.emergency_stop(true);
        assert_eq!(procedure.poll(&mut axis, &mut switch).unwrap(), HomingStatus::Failed);
        assert!(procedure.is_finished());
        assert!(!axis.is_homed());
        assert!(axis.motion_complete());
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        assert_eq!(
            HomingProcedure::new(Direction::Negative, 0.0, 100).unwrap_err(),
            AxisError::InvalidSpeed(0.0)
        );
    }
}
