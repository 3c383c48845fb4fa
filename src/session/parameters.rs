//! Stroke parameters shared by callers and the pattern loop.
//!
//! Callers write through [`EngineHandle`](super::EngineHandle) under the
//! parameter lock; the pattern loop reads under the same lock. Every value is
//! clamped on the way in, so the selected pattern only ever sees positions
//! inside the machine envelope.

use crate::config::{MotionLimits, StartupConfig};
use crate::error::PatternError;
use crate::pattern::math::map_range;
use crate::pattern::{MotionCommand, Pattern, PatternKind};

/// Shortest accepted duration of a full stroke, in seconds.
pub const MIN_TIME_OF_STROKE: f32 = 0.01;

/// Longest accepted duration of a full stroke, in seconds.
pub const MAX_TIME_OF_STROKE: f32 = 120.0;

/// Lowest speed or rate handed to the axis, in steps/s or steps/s².
pub(crate) const MIN_RATE: f32 = 1.0;

#[derive(Debug, Clone)]
pub(crate) struct ParameterState {
    pattern: PatternKind,
    configured: MotionLimits,
    limits: MotionLimits,
    time_of_stroke: f32,
    depth: i64,
    stroke: i64,
    sensation: f32,
    seed: u64,

    /// Half-stroke counter; -1 before the first stroke of a run.
    pub(crate) index: i64,
    /// Re-derive the in-flight move on the next pattern tick.
    pub(crate) apply_pending: bool,
    /// Speed of setup-depth moves in steps/s.
    pub(crate) setup_speed: f32,
    /// Setup depth follows the sensation inside the stroke window.
    pub(crate) fancy_setup: bool,
}

impl ParameterState {
    pub(crate) fn new(limits: MotionLimits, startup: &StartupConfig) -> Result<Self, PatternError> {
        let pattern = PatternKind::from_name(startup.pattern.as_str(), startup.random_seed)?;
        let mut state = Self {
            pattern,
            configured: limits,
            limits,
            time_of_stroke: 1.0,
            depth: limits.max_step,
            stroke: limits.max_step / 3,
            sensation: 0.0,
            seed: startup.random_seed,
            index: -1,
            apply_pending: false,
            setup_speed: limits.max_step_per_second / 10.0,
            fancy_setup: false,
        };

        state.push_speed_limit();
        state.set_speed(startup.speed_strokes_per_minute);
        if let Some(depth) = startup.depth {
            state.set_depth_mm(depth.0);
        }
        if let Some(stroke) = startup.stroke {
            state.set_stroke_mm(stroke.0);
        }
        state.set_sensation(startup.sensation);
        state.pattern.set_depth(state.depth);
        state.pattern.set_stroke(state.stroke);
        Ok(state)
    }

    pub(crate) fn pattern(&self) -> &PatternKind {
        &self.pattern
    }

    pub(crate) fn limits(&self) -> &MotionLimits {
        &self.limits
    }

    /// Set the speed in strokes per minute. Non-positive speeds give the
    /// slowest stroke.
    pub(crate) fn set_speed(&mut self, strokes_per_minute: f32) {
        let seconds = 60.0 / strokes_per_minute;
        self.time_of_stroke = if seconds > 0.0 {
            seconds.clamp(MIN_TIME_OF_STROKE, MAX_TIME_OF_STROKE)
        } else {
            MAX_TIME_OF_STROKE
        };
        self.pattern.set_time_of_stroke(self.time_of_stroke);
    }

    pub(crate) fn speed(&self) -> f32 {
        60.0 / self.time_of_stroke
    }

    pub(crate) fn time_of_stroke(&self) -> f32 {
        self.time_of_stroke
    }

    pub(crate) fn set_depth_mm(&mut self, mm: f32) {
        self.depth = self.limits.clamp_position(self.limits.to_steps(mm));
        self.pattern.set_depth(self.depth);
    }

    pub(crate) fn depth(&self) -> i64 {
        self.depth
    }

    pub(crate) fn set_stroke_mm(&mut self, mm: f32) {
        self.stroke = self.limits.clamp_position(self.limits.to_steps(mm));
        self.pattern.set_stroke(self.stroke);
    }

    pub(crate) fn stroke(&self) -> i64 {
        self.stroke
    }

    /// Set the sensation, clamped to -100..100. NaN counts as 0.
    pub(crate) fn set_sensation(&mut self, sensation: f32) {
        self.sensation = if sensation.is_nan() {
            0.0
        } else {
            sensation.clamp(-100.0, 100.0)
        };
        self.pattern.set_sensation(self.sensation);
    }

    pub(crate) fn sensation(&self) -> f32 {
        self.sensation
    }

    /// Switch pattern, keeping the parameters, and restart the stroke count.
    pub(crate) fn set_pattern(&mut self, index: usize) -> Result<(), PatternError> {
        self.pattern.switch_to(index, self.seed)?;
        self.push_speed_limit();
        self.index = -1;
        Ok(())
    }

    /// Lower (or restore) the speed limit, in mm/s. Never above the
    /// configured maximum.
    pub(crate) fn set_max_speed(&mut self, mm_per_sec: f32) {
        let steps = mm_per_sec * self.limits.steps_per_mm;
        self.limits.max_step_per_second = steps.max(MIN_RATE).min(self.configured.max_step_per_second);
        self.push_speed_limit();
    }

    /// Lower (or restore) the acceleration limit, in mm/s². Never above the
    /// configured maximum.
    pub(crate) fn set_max_acceleration(&mut self, mm_per_sec2: f32) {
        let steps = mm_per_sec2 * self.limits.steps_per_mm;
        self.limits.max_step_acceleration =
            steps.max(MIN_RATE).min(self.configured.max_step_acceleration);
        self.push_speed_limit();
    }

    fn push_speed_limit(&mut self) {
        self.pattern.set_speed_limit(
            self.limits.max_step_per_second,
            self.limits.max_step_acceleration,
            self.limits.steps_per_mm,
        );
    }

    /// Where a setup-depth move goes: the depth, or with fancy adjustment
    /// the sensation mapped into `[depth - stroke, depth]`.
    pub(crate) fn setup_target(&self) -> i64 {
        let target = if self.fancy_setup {
            map_range(
                self.sensation as i64,
                -100,
                100,
                self.depth - self.stroke,
                self.depth,
            )
        } else {
            self.depth
        };
        self.limits.clamp_position(target)
    }

    /// Clamp a pattern command into the machine envelope.
    ///
    /// Returns the command to execute and whether speed or acceleration had
    /// to be reduced.
    pub(crate) fn clip(&self, command: MotionCommand) -> (MotionCommand, bool) {
        let mut clipped = false;
        let mut speed = command.speed;
        let mut acceleration = command.acceleration;

        if speed > self.limits.max_step_per_second {
            speed = self.limits.max_step_per_second;
            clipped = true;
        }
        if acceleration > self.limits.max_step_acceleration {
            acceleration = self.limits.max_step_acceleration;
            clipped = true;
        }

        let command = MotionCommand {
            target: self.limits.clamp_position(command.target),
            speed: speed.max(MIN_RATE),
            acceleration: acceleration.max(MIN_RATE),
            skip: command.skip,
        };
        (command, clipped)
    }

    /// Next command of the running pattern for the current index.
    pub(crate) fn next_command(&mut self, now_ms: u64) -> MotionCommand {
        let index = self.index.max(0) as u32;
        self.pattern.next_target(index, now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Millimeters, MotorConfig, TravelConfig};
    use crate::config::{MillimetersPerSec, MillimetersPerSecSquared};

    fn limits() -> MotionLimits {
        let motor = MotorConfig {
            steps_per_mm: 10.0,
            max_speed: MillimetersPerSec(100.0),
            max_acceleration: MillimetersPerSecSquared(1000.0),
            max_deceleration: None,
            invert_direction: false,
            enable_active_low: true,
        };
        let travel = TravelConfig {
            physical_travel: Millimeters(110.0),
            keepout: Millimeters(5.0),
        };
        MotionLimits::from_config(&motor, &travel)
    }

    fn state() -> ParameterState {
        ParameterState::new(limits(), &StartupConfig::default()).unwrap()
    }

    #[test]
    fn test_startup_defaults() {
        let s = state();
        assert_eq!(s.depth(), 1000);
        assert_eq!(s.stroke(), 333);
        assert_eq!(s.time_of_stroke(), 1.0);
        assert_eq!(s.pattern().name(), "Simple Stroke");
        assert_eq!(s.pattern().params().depth, 1000);
        assert_eq!(s.pattern().params().max_speed, 1000.0);
        assert_eq!(s.index, -1);
    }

    #[test]
    fn test_speed_clamps_to_stroke_time_range() {
        let mut s = state();
        s.set_speed(30.0);
        assert_eq!(s.time_of_stroke(), 2.0);
        assert_eq!(s.speed(), 30.0);

        s.set_speed(1.0e6);
        assert_eq!(s.time_of_stroke(), MIN_TIME_OF_STROKE);

        s.set_speed(0.0);
        assert_eq!(s.time_of_stroke(), MAX_TIME_OF_STROKE);
        s.set_speed(-5.0);
        assert_eq!(s.time_of_stroke(), MAX_TIME_OF_STROKE);
        s.set_speed(f32::NAN);
        assert_eq!(s.time_of_stroke(), MAX_TIME_OF_STROKE);
    }

    #[test]
    fn test_depth_and_stroke_clamp_into_envelope() {
        let mut s = state();
        s.set_depth_mm(250.0);
        assert_eq!(s.depth(), 1000);
        s.set_depth_mm(-3.0);
        assert_eq!(s.depth(), 0);
        s.set_stroke_mm(42.5);
        assert_eq!(s.stroke(), 425);
        assert_eq!(s.pattern().params().stroke, 425);
    }

    #[test]
    fn test_sensation_clamps_and_rejects_nan() {
        let mut s = state();
        s.set_sensation(150.0);
        assert_eq!(s.sensation(), 100.0);
        s.set_sensation(f32::NAN);
        assert_eq!(s.sensation(), 0.0);
    }

    #[test]
    fn test_fancy_setup_target() {
        let mut s = state();
        s.set_depth_mm(80.0);
        s.set_stroke_mm(40.0);
        assert_eq!(s.setup_target(), 800);

        s.fancy_setup = true;
        s.set_sensation(-100.0);
        assert_eq!(s.setup_target(), 400);
        s.set_sensation(0.0);
        assert_eq!(s.setup_target(), 600);
    }

    #[test]
    fn test_clip_reports_reductions() {
        let s = state();
        let (cmd, clipped) = s.clip(MotionCommand {
            target: 5000,
            speed: 4000.0,
            acceleration: 100.0,
            skip: false,
        });
        assert!(clipped);
        assert_eq!(cmd.target, 1000);
        assert_eq!(cmd.speed, 1000.0);
        assert_eq!(cmd.acceleration, 100.0);

        let (cmd, clipped) = s.clip(MotionCommand {
            target: 10,
            speed: 0.0,
            acceleration: f32::NAN,
            skip: false,
        });
        assert!(!clipped);
        assert_eq!(cmd.speed, MIN_RATE);
        assert_eq!(cmd.acceleration, MIN_RATE);
    }

    #[test]
    fn test_max_speed_never_exceeds_configuration() {
        let mut s = state();
        s.set_max_speed(50.0);
        assert_eq!(s.limits().max_step_per_second, 500.0);
        assert_eq!(s.pattern().params().max_speed, 500.0);
        s.set_max_speed(1000.0);
        assert_eq!(s.limits().max_step_per_second, 1000.0);
        s.set_max_acceleration(0.0);
        assert_eq!(s.limits().max_step_acceleration, MIN_RATE);
    }

    #[test]
    fn test_set_pattern_restarts_count() {
        let mut s = state();
        s.index = 7;
        s.set_pattern(3).unwrap();
        assert_eq!(s.pattern().name(), "Half'n'Half");
        assert_eq!(s.index, -1);
        assert!(s.set_pattern(42).is_err());
        assert_eq!(s.pattern().name(), "Half'n'Half");
    }
}
