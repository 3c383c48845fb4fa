//! Step-period generation.
//!
//! The axis is driven one step at a time. After each step the generator
//! decides the period until the next one from the current period, the
//! distance still to go and the configured speed, acceleration and
//! deceleration. Acceleration uses the first-order expansion
//! `p' = p·(1 − a·p²)` and deceleration `p' = p·(1 + d·p²)`, with `a` and `d`
//! in steps/µs².

use libm::{roundf, sqrtf};

use crate::error::AxisError;

/// Microseconds per second.
const US_PER_SEC: f32 = 1_000_000.0;

/// Converts steps/s² into steps/µs².
const US2_PER_SEC2: f32 = 1.0e12;

/// Ratio between the slowest step period and the period below which the axis
/// still counts as moving when it lands on its target.
const STOPPED_PERIOD_DIVISOR: f32 = 2.8;

/// Direction of motion along the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Toward decreasing step counts.
    Negative,
    /// Not moving.
    #[default]
    Stopped,
    /// Toward increasing step counts.
    Positive,
}

impl Direction {
    /// Direction from the sign of a step count; zero is `Stopped`.
    #[inline]
    pub fn from_sign(value: i64) -> Self {
        match value {
            v if v > 0 => Direction::Positive,
            v if v < 0 => Direction::Negative,
            _ => Direction::Stopped,
        }
    }

    /// Get the sign multiplier (-1, 0 or +1).
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Negative => -1,
            Direction::Stopped => 0,
            Direction::Positive => 1,
        }
    }

    /// The opposite direction; `Stopped` stays `Stopped`.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Negative => Direction::Positive,
            Direction::Stopped => Direction::Stopped,
            Direction::Positive => Direction::Negative,
        }
    }

    /// Check if moving.
    #[inline]
    pub fn is_moving(self) -> bool {
        self != Direction::Stopped
    }
}

/// Axis motion phase, driven solely by step processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionPhase {
    /// At rest.
    #[default]
    Stopped,
    /// Step period shrinking toward the desired period.
    Accelerating,
    /// Holding the desired period.
    Cruising,
    /// Step period growing toward the slowest period.
    Decelerating,
}

/// Result of one step-period decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDecision {
    /// Period until the next step, in microseconds.
    pub period_us: f32,
    /// Direction for the next step. Differs from the input only on reversal.
    pub direction: Direction,
    /// Phase implied by the decision.
    pub phase: MotionPhase,
}

/// Speed, acceleration and deceleration converted into step-period terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTiming {
    speed: f32,
    acceleration: f32,
    deceleration: f32,
    desired_period_us: f32,
    accel_per_us2: f32,
    decel_per_us2: f32,
    slowest_period_us: f32,
    min_stopped_period_us: f32,
}

impl StepTiming {
    /// Create timing from steps/s, steps/s² and steps/s².
    ///
    /// # Errors
    ///
    /// Rejects zero, negative and non-finite values: a zero speed gives an
    /// infinite period and a zero rate divides by zero in the braking
    /// distance.
    pub fn new(speed: f32, acceleration: f32, deceleration: f32) -> Result<Self, AxisError> {
        let mut timing = Self {
            speed: 0.0,
            acceleration: 0.0,
            deceleration: 0.0,
            desired_period_us: 0.0,
            accel_per_us2: 0.0,
            decel_per_us2: 0.0,
            slowest_period_us: 0.0,
            min_stopped_period_us: 0.0,
        };
        timing.set_speed(speed)?;
        timing.set_acceleration(acceleration)?;
        timing.set_deceleration(deceleration)?;
        Ok(timing)
    }

    /// Set the cruise speed in steps/s.
    pub fn set_speed(&mut self, speed: f32) -> Result<(), AxisError> {
        if !is_positive(speed) {
            return Err(AxisError::InvalidSpeed(speed));
        }
        self.speed = speed;
        self.desired_period_us = US_PER_SEC / speed;
        Ok(())
    }

    /// Set the acceleration in steps/s².
    ///
    /// Also fixes the slowest step period: the period of the first step from
    /// rest, `1 / sqrt(2·a)` seconds.
    pub fn set_acceleration(&mut self, acceleration: f32) -> Result<(), AxisError> {
        if !is_positive(acceleration) {
            return Err(AxisError::InvalidAcceleration(acceleration));
        }
        self.acceleration = acceleration;
        self.accel_per_us2 = acceleration / US2_PER_SEC2;
        self.slowest_period_us = US_PER_SEC / sqrtf(2.0 * acceleration);
        self.min_stopped_period_us = self.slowest_period_us / STOPPED_PERIOD_DIVISOR;
        Ok(())
    }

    /// Set the deceleration in steps/s².
    pub fn set_deceleration(&mut self, deceleration: f32) -> Result<(), AxisError> {
        if !is_positive(deceleration) {
            return Err(AxisError::InvalidDeceleration(deceleration));
        }
        self.deceleration = deceleration;
        self.decel_per_us2 = deceleration / US2_PER_SEC2;
        Ok(())
    }

    /// Cruise speed in steps/s.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Acceleration in steps/s².
    #[inline]
    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    /// Deceleration in steps/s².
    #[inline]
    pub fn deceleration(&self) -> f32 {
        self.deceleration
    }

    /// Step period at cruise speed, in µs.
    #[inline]
    pub fn desired_period_us(&self) -> f32 {
        self.desired_period_us
    }

    /// Longest period the generator produces, in µs.
    #[inline]
    pub fn slowest_period_us(&self) -> f32 {
        self.slowest_period_us
    }

    /// A move may end on its target only once the period is at least this.
    #[inline]
    pub fn min_stopped_period_us(&self) -> f32 {
        self.min_stopped_period_us
    }
}

/// Stateless step-period generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfileGenerator {
    timing: StepTiming,
}

impl MotionProfileGenerator {
    /// Create a generator from validated timing.
    pub fn new(timing: StepTiming) -> Self {
        Self { timing }
    }

    /// Current timing.
    #[inline]
    pub fn timing(&self) -> &StepTiming {
        &self.timing
    }

    /// Mutable timing, for run-time speed and rate changes.
    #[inline]
    pub fn timing_mut(&mut self) -> &mut StepTiming {
        &mut self.timing
    }

    /// Steps needed to brake from `period_us` to rest: `v² / (2·d)`.
    pub fn deceleration_distance(&self, period_us: f32) -> i64 {
        if period_us <= 0.0 {
            return 0;
        }
        let steps = 0.5 / (self.timing.decel_per_us2 * period_us * period_us);
        if steps.is_finite() {
            roundf(steps) as i64
        } else {
            0
        }
    }

    /// Decide the period until the next step.
    ///
    /// # Arguments
    ///
    /// * `current_period_us` - Period of the step just taken
    /// * `distance` - Signed steps from the current position to the target
    /// * `direction` - Direction of the step just taken
    ///
    /// A distance of zero counts as lying in the positive direction. Moving
    /// toward the target, the axis brakes once inside the braking distance or
    /// while faster than the desired speed, and accelerates otherwise.
    /// Moving away from it, the axis brakes down to the slowest period and
    /// only then reverses, keeping the current period.
    pub fn next_step_period(
        &self,
        current_period_us: f32,
        distance: i64,
        direction: Direction,
    ) -> StepDecision {
        let t = &self.timing;
        let toward = if distance >= 0 {
            Direction::Positive
        } else {
            Direction::Negative
        };

        if direction == toward {
            let braking = distance.unsigned_abs() < self.deceleration_distance(current_period_us) as u64;
            if braking || current_period_us < t.desired_period_us {
                self.slow_down(current_period_us, direction)
            } else {
                self.speed_up(current_period_us, direction)
            }
        } else if current_period_us < t.slowest_period_us {
            self.slow_down(current_period_us, direction)
        } else {
            StepDecision {
                period_us: current_period_us,
                direction: direction.reversed(),
                phase: MotionPhase::Decelerating,
            }
        }
    }

    fn speed_up(&self, period: f32, direction: Direction) -> StepDecision {
        let t = &self.timing;
        let next = period - t.accel_per_us2 * period * period * period;
        if next <= t.desired_period_us {
            StepDecision {
                period_us: t.desired_period_us,
                direction,
                phase: MotionPhase::Cruising,
            }
        } else {
            StepDecision {
                period_us: next,
                direction,
                phase: MotionPhase::Accelerating,
            }
        }
    }

    fn slow_down(&self, period: f32, direction: Direction) -> StepDecision {
        let t = &self.timing;
        let next = period + t.decel_per_us2 * period * period * period;
        StepDecision {
            period_us: if next > t.slowest_period_us {
                t.slowest_period_us
            } else {
                next
            },
            direction,
            phase: MotionPhase::Decelerating,
        }
    }
}

fn is_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}
