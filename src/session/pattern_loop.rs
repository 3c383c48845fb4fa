//! The slow loop: turns the selected pattern into axis commands.
//!
//! Runs every [`PATTERN_TICK_MS`] while the session is in
//! [`SessionState::Pattern`]. A tick that finds the parameter lock taken is
//! skipped, never waited out. Nothing is planned while a holding emergency
//! stop is latched.

use crate::pattern::MotionCommand;

use super::event::EngineEvent;
use super::parameters::ParameterState;
use super::shared::{AxisCommand, Shared};
use super::state::SessionState;

/// Interval between pattern refreshes in milliseconds.
pub const PATTERN_TICK_MS: u64 = 10;

/// One pattern tick at time `now_ms`.
pub(crate) fn refresh(shared: &Shared, now_ms: u64) {
    // Epoch before state: a stop in between either shows up in the state or
    // makes whatever is pushed below stale.
    let epoch = shared.epoch();
    if shared.state() != SessionState::Pattern {
        return;
    }
    if shared.is_emergency_stop_held() {
        trace!("pattern tick skipped: emergency stop held");
        return;
    }

    let Some(mut params) = shared.try_lock_params() else {
        trace!("pattern tick skipped: parameters busy");
        return;
    };

    if params.apply_pending {
        params.apply_pending = false;
        if params.index < 0 {
            params.index = 0;
        }
        let command = params.next_command(now_ms);
        if !command.skip {
            let deceleration = crash_deceleration(shared, &params, &command);
            commit(shared, &params, command, deceleration, epoch);
        }
    } else if shared.status.applied_seq() >= shared.last_seq() && shared.status.motion_complete() {
        params.index += 1;
        let command = params.next_command(now_ms);
        if command.skip {
            params.index -= 1;
        } else {
            trace!("stroke {}", params.index);
            commit(shared, &params, command, None, epoch);
        }
    }
}

/// Deceleration for a command that replaces a move in flight.
///
/// Never lower than what the axis is braking with now, and high enough to
/// stop within the distance left to the new target, up to the machine limit.
/// `None` at rest.
fn crash_deceleration(
    shared: &Shared,
    params: &ParameterState,
    command: &MotionCommand,
) -> Option<f32> {
    let speed = shared.status.speed();
    if speed <= 0.0 {
        return None;
    }
    let target = params.limits().clamp_position(command.target);
    let distance = (target - shared.status.position()).unsigned_abs().max(1) as f32;
    let needed = speed * speed / (2.0 * distance);
    let current = shared.status.deceleration();
    let limit = params.limits().max_step_deceleration;
    let deceleration = command.acceleration.max(current).max(needed).min(limit);
    if deceleration > command.acceleration {
        debug!("crash avoidance: deceleration {} -> {}", command.acceleration, deceleration);
    }
    Some(deceleration)
}

/// Clip a command to the machine limits, queue it and report it.
pub(crate) fn commit(
    shared: &Shared,
    params: &ParameterState,
    command: MotionCommand,
    deceleration: Option<f32>,
    epoch: u32,
) {
    let (command, clipped) = params.clip(command);
    let limits = params.limits();
    if clipped {
        debug!(
            "clipped to {} steps/s, {} steps/s²",
            command.speed, command.acceleration
        );
    }

    let deceleration = deceleration
        .unwrap_or(command.acceleration)
        .min(limits.max_step_deceleration)
        .max(super::parameters::MIN_RATE);

    shared.push(
        AxisCommand::Move {
            target: command.target,
            speed: command.speed,
            acceleration: command.acceleration,
            deceleration,
        },
        epoch,
    );
    shared.emit(EngineEvent::Telemetry {
        position_mm: limits.to_millimeters(command.target),
        speed_mm_per_sec: command.speed / limits.steps_per_mm,
        clipped,
    });
}
