//! Caller-side API of a running session.

use std::sync::Arc;

use crate::config::EndstopConfig;
use crate::error::PatternError;
use crate::motion::Direction;
use crate::pattern::{pattern_count, Pattern};

use super::event::EngineEvent;
use super::parameters::{ParameterState, MIN_RATE};
use super::shared::{AxisCommand, Shared};
use super::state::SessionState;
use super::streaming::{plan_stream_move, stream_target};

/// Acceleration of positioning moves (homing park, move to min/max, setup
/// depth) as a fraction of the machine maximum.
const POSITIONING_ACCELERATION_DIVISOR: f32 = 10.0;

/// Clonable handle for UI, network and other caller threads.
///
/// Setters block briefly on the parameter lock and never fail: out-of-range
/// values are clamped. Motion requests that are not allowed in the current
/// state return `false` and change nothing.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Shared>,
}

impl EngineHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// The axis has a valid zero reference.
    pub fn is_homed(&self) -> bool {
        self.shared.is_homed()
    }

    /// Axis position in mm as last published by the step loop.
    pub fn position(&self) -> f32 {
        self.shared
            .machine()
            .to_millimeters(self.shared.status.position())
    }

    /// Axis target in mm as last published by the step loop.
    pub fn target(&self) -> f32 {
        self.shared
            .machine()
            .to_millimeters(self.shared.status.target())
    }

    /// A holding emergency stop is latched. Motion requests are refused
    /// until [`release_emergency_stop`](Self::release_emergency_stop).
    pub fn is_emergency_stop_held(&self) -> bool {
        self.shared.is_emergency_stop_held()
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    /// Set the speed in strokes per minute.
    ///
    /// With `apply_now` while a pattern runs, the stroke in flight is
    /// re-planned; otherwise the change takes effect at the next stroke.
    pub fn set_speed(&self, strokes_per_minute: f32, apply_now: bool) {
        self.update(apply_now, |p| p.set_speed(strokes_per_minute));
    }

    /// Speed in strokes per minute.
    pub fn speed(&self) -> f32 {
        self.shared.lock_params().speed()
    }

    /// Set the depth in mm, clamped to the usable travel.
    pub fn set_depth(&self, mm: f32, apply_now: bool) {
        self.update(apply_now, |p| p.set_depth_mm(mm));
    }

    /// Depth in mm.
    pub fn depth(&self) -> f32 {
        let params = self.shared.lock_params();
        params.limits().to_millimeters(params.depth())
    }

    /// Set the stroke length in mm, clamped to the usable travel.
    pub fn set_stroke(&self, mm: f32, apply_now: bool) {
        self.update(apply_now, |p| p.set_stroke_mm(mm));
    }

    /// Stroke length in mm.
    pub fn stroke(&self) -> f32 {
        let params = self.shared.lock_params();
        params.limits().to_millimeters(params.stroke())
    }

    /// Set the sensation, clamped to -100..100.
    pub fn set_sensation(&self, sensation: f32, apply_now: bool) {
        self.update(apply_now, |p| p.set_sensation(sensation));
    }

    /// Sensation.
    pub fn sensation(&self) -> f32 {
        self.shared.lock_params().sensation()
    }

    /// Select the pattern at catalogue `index`. The stroke count restarts.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::UnknownIndex`] past the end of the catalogue;
    /// the running pattern is kept.
    pub fn set_pattern(&self, index: usize, apply_now: bool) -> Result<(), PatternError> {
        let mut params = self.shared.lock_params();
        params.set_pattern(index)?;
        info!("pattern {}", params.pattern().name());
        if apply_now && self.shared.state() == SessionState::Pattern {
            params.apply_pending = true;
        }
        Ok(())
    }

    /// Catalogue index of the selected pattern.
    pub fn pattern(&self) -> usize {
        self.shared.lock_params().pattern().index()
    }

    /// Name of the selected pattern.
    pub fn pattern_name(&self) -> &'static str {
        self.shared.lock_params().pattern().name()
    }

    /// Number of patterns to choose from.
    pub fn number_of_patterns(&self) -> usize {
        pattern_count()
    }

    /// Lower the speed limit, in mm/s. Never above the configured maximum.
    pub fn set_max_speed(&self, mm_per_sec: f32) {
        self.shared.lock_params().set_max_speed(mm_per_sec);
    }

    /// Lower the acceleration limit, in mm/s². Never above the configured
    /// maximum.
    pub fn set_max_acceleration(&self, mm_per_sec2: f32) {
        self.shared.lock_params().set_max_acceleration(mm_per_sec2);
    }

    fn update(&self, apply_now: bool, change: impl FnOnce(&mut ParameterState)) {
        let mut params = self.shared.lock_params();
        change(&mut params);
        match self.shared.state() {
            SessionState::Pattern if apply_now => params.apply_pending = true,
            SessionState::SetupDepth => self.push_setup_move(&params),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Motion
    // ------------------------------------------------------------------

    /// Start the selected pattern. Only from `Ready` or `SetupDepth`.
    pub fn start_pattern(&self) -> bool {
        if self.refused_while_held("start a pattern") {
            return false;
        }
        let mut params = self.shared.lock_params();
        let allowed = |s: SessionState| matches!(s, SessionState::Ready | SessionState::SetupDepth);
        if self.shared.transition(allowed, SessionState::Pattern).is_none() {
            warn!("cannot start a pattern from {}", self.shared.state());
            return false;
        }
        params.index = -1;
        params.apply_pending = false;
        let deceleration = params.limits().max_step_deceleration;
        self.shared.push_now(AxisCommand::Stop { deceleration });
        true
    }

    /// Brake to rest and return to `Ready`. No effect unless the session is
    /// moving the axis. Never waits for the parameter lock.
    pub fn stop_motion(&self) {
        if self
            .shared
            .transition(SessionState::is_moving, SessionState::Ready)
            .is_none()
        {
            return;
        }
        self.shared.bump_epoch();
        let limits = self.shared.machine();
        self.shared.push_now(AxisCommand::Stop {
            deceleration: limits.max_step_deceleration,
        });
        self.shared.emit(EngineEvent::Telemetry {
            position_mm: limits.to_millimeters(self.shared.status.position()),
            speed_mm_per_sec: 0.0,
            clipped: false,
        });
    }

    /// Drive to the front end of the travel at `speed` mm/s. Homed only.
    pub fn move_to_max(&self, speed_mm_per_sec: f32) -> bool {
        self.move_to_end(Direction::Positive, speed_mm_per_sec)
    }

    /// Drive to the back end of the travel at `speed` mm/s. Homed only.
    pub fn move_to_min(&self, speed_mm_per_sec: f32) -> bool {
        self.move_to_end(Direction::Negative, speed_mm_per_sec)
    }

    fn move_to_end(&self, end: Direction, speed_mm_per_sec: f32) -> bool {
        if !self.shared.is_homed() {
            warn!("refusing to move: not homed");
            return false;
        }
        if self.refused_while_held("move") {
            return false;
        }
        let params = self.shared.lock_params();
        self.stop_motion();

        let limits = params.limits();
        let target = if end == Direction::Positive {
            limits.max_step
        } else {
            limits.min_step
        };
        let speed = self.clamp_speed(&params, speed_mm_per_sec);
        let acceleration = limits.max_step_acceleration / POSITIONING_ACCELERATION_DIVISOR;
        self.shared.push_now(AxisCommand::Move {
            target,
            speed,
            acceleration,
            deceleration: acceleration,
        });
        self.shared.emit(EngineEvent::Telemetry {
            position_mm: limits.to_millimeters(target),
            speed_mm_per_sec: speed / limits.steps_per_mm,
            clipped: false,
        });
        true
    }

    /// Move to the depth and follow later depth changes. With `fancy` the
    /// sensation picks the point inside `[depth - stroke, depth]`. Homed
    /// only.
    pub fn setup_depth(&self, speed_mm_per_sec: f32, fancy: bool) -> bool {
        if !self.shared.is_homed() {
            warn!("refusing to set up depth: not homed");
            return false;
        }
        if self.refused_while_held("set up depth") {
            return false;
        }
        let mut params = self.shared.lock_params();
        self.stop_motion();
        params.fancy_setup = fancy;
        params.setup_speed = self.clamp_speed(&params, speed_mm_per_sec);
        self.shared.set_state(SessionState::SetupDepth);
        self.push_setup_move(&params);
        true
    }

    fn push_setup_move(&self, params: &ParameterState) {
        let limits = params.limits();
        let target = params.setup_target();
        let acceleration = limits.max_step_acceleration / POSITIONING_ACCELERATION_DIVISOR;
        self.shared.push_now(AxisCommand::Move {
            target,
            speed: params.setup_speed,
            acceleration,
            deceleration: acceleration,
        });
        self.shared.emit(EngineEvent::Telemetry {
            position_mm: limits.to_millimeters(target),
            speed_mm_per_sec: params.setup_speed / limits.steps_per_mm,
            clipped: false,
        });
    }

    /// Enable the driver and home against the endstop at `speed` mm/s (the
    /// endstop's homing speed if not positive). Completion is reported with
    /// [`EngineEvent::HomingComplete`]; on success the axis parks at the end
    /// of the travel nearest the switch and the session becomes `Ready`.
    pub fn enable_and_home(&self, endstop: &EndstopConfig, speed_mm_per_sec: f32) {
        let params = self.shared.lock_params();
        self.stop_motion();
        self.shared.set_homed(false);
        self.shared.set_state(SessionState::Undefined);

        let limits = params.limits();
        let speed_mm = if speed_mm_per_sec > 0.0 {
            speed_mm_per_sec
        } else {
            endstop.homing_speed.0
        };
        let (switch_position, park) = if endstop.home_to_back {
            (-limits.keepout_steps, limits.min_step)
        } else {
            (
                limits.physical_travel_steps - limits.keepout_steps,
                limits.max_step,
            )
        };

        info!("homing toward the {} switch", if endstop.home_to_back { "back" } else { "front" });
        self.shared.push_now(AxisCommand::Enable);
        self.shared.push_now(AxisCommand::Home {
            direction: Direction::from_sign(endstop.direction_toward_switch() as i64),
            speed: self.clamp_speed(&params, speed_mm),
            max_distance: limits.physical_travel_steps,
            switch_position,
            park,
            park_acceleration: limits.max_step_acceleration / POSITIONING_ACCELERATION_DIVISOR,
        });
    }

    /// Declare that the axis rests against the back hard stop, then drive
    /// to position 0 at `speed` mm/s. Only from `Undefined`.
    pub fn this_is_home(&self, speed_mm_per_sec: f32) -> bool {
        if self.refused_while_held("declare home") {
            return false;
        }
        let params = self.shared.lock_params();
        let undefined = |s: SessionState| s == SessionState::Undefined;
        if self.shared.transition(undefined, SessionState::Ready).is_none() {
            return false;
        }

        let limits = params.limits();
        let speed = self.clamp_speed(&params, speed_mm_per_sec);
        let acceleration = limits.max_step_acceleration / POSITIONING_ACCELERATION_DIVISOR;
        self.shared.push_now(AxisCommand::Enable);
        self.shared.push_now(AxisCommand::DeclareHome {
            position: -limits.keepout_steps,
        });
        self.shared.push_now(AxisCommand::Move {
            target: limits.min_step,
            speed,
            acceleration,
            deceleration: acceleration,
        });
        self.shared.set_homed(true);
        self.shared.emit(EngineEvent::Telemetry {
            position_mm: limits.to_millimeters(limits.min_step),
            speed_mm_per_sec: speed / limits.steps_per_mm,
            clipped: false,
        });
        true
    }

    /// Stop, disable the driver and forget the home reference.
    pub fn disable(&self) {
        self.shared.set_state(SessionState::Undefined);
        self.shared.set_homed(false);
        self.shared.bump_epoch();
        self.shared.push_now(AxisCommand::Disable);
    }

    /// Stop the axis on the next step-loop iteration, bypassing the
    /// parameter lock and anything queued. The session drops back to
    /// `Ready` so no further pattern moves are issued.
    ///
    /// With `hold` the axis ignores every target, and motion requests are
    /// refused, until [`release_emergency_stop`](Self::release_emergency_stop).
    pub fn emergency_stop(&self, hold: bool) {
        self.shared.request_emergency_stop(hold);
        let _ = self
            .shared
            .transition(SessionState::is_moving, SessionState::Ready);
        self.shared.bump_epoch();
    }

    /// Release a holding emergency stop. The session stays in `Ready`;
    /// motion resumes only on a new request.
    pub fn release_emergency_stop(&self) {
        let _ = self
            .shared
            .transition(SessionState::is_moving, SessionState::Ready);
        self.shared.request_release();
    }

    fn refused_while_held(&self, what: &str) -> bool {
        let held = self.shared.is_emergency_stop_held();
        if held {
            warn!("refusing to {}: emergency stop held", what);
        }
        held
    }

    /// Follow streamed positions. Only from `Ready`; the axis holds its
    /// position until the first [`stream_position`](Self::stream_position).
    pub fn start_streaming(&self) -> bool {
        if self.refused_while_held("stream") {
            return false;
        }
        let ready = |s: SessionState| s == SessionState::Ready;
        self.shared
            .transition(ready, SessionState::Streaming)
            .is_some()
    }

    /// Be at `percent` of the stroke window (0 = `depth - stroke`,
    /// 100 = `depth`) in `duration_ms`.
    ///
    /// Returns `true` if a move was queued. Requests that cannot be reached
    /// in time are shortened and reported as clipped in the telemetry.
    pub fn stream_position(&self, percent: f32, duration_ms: u32) -> bool {
        if self.shared.state() != SessionState::Streaming {
            return false;
        }
        let params = self.shared.lock_params();
        let limits = params.limits();
        let target = limits.clamp_position(stream_target(percent, params.depth(), params.stroke()));

        let Some(plan) = plan_stream_move(
            self.shared.status.position(),
            target,
            duration_ms as f32 / 1000.0,
            limits.max_step_per_second,
            limits.max_step_acceleration,
        ) else {
            return false;
        };

        // A move in flight keeps at least the acceleration it brakes with.
        let acceleration = if self.shared.status.speed() > 0.0 {
            plan.acceleration
                .max(self.shared.status.acceleration())
                .min(limits.max_step_acceleration)
        } else {
            plan.acceleration
        };

        self.shared.push_now(AxisCommand::Move {
            target: plan.target,
            speed: plan.speed,
            acceleration,
            deceleration: acceleration.min(limits.max_step_deceleration),
        });
        self.shared.emit(EngineEvent::Telemetry {
            position_mm: limits.to_millimeters(plan.target),
            speed_mm_per_sec: plan.speed / limits.steps_per_mm,
            clipped: plan.shortened,
        });
        true
    }

    fn clamp_speed(&self, params: &ParameterState, mm_per_sec: f32) -> f32 {
        let limits = params.limits();
        (mm_per_sec * limits.steps_per_mm)
            .max(MIN_RATE)
            .min(limits.max_step_per_second)
    }

    /// Ask the runtime threads to stop.
    pub(crate) fn shutdown(&self) {
        self.shared.request_shutdown();
    }
}
