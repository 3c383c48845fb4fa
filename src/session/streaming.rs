//! Timed moves for externally streamed positions.
//!
//! A streaming source sends "be at P within T ms". The planner turns that
//! into a target, speed and acceleration the axis can actually execute. If
//! the distance cannot be covered in time within the limits, the target is
//! pulled closer. The profile is a triangle when there is just enough time
//! and a trapezoid otherwise.

/// Floor for planned speeds and accelerations, in steps/s and steps/s².
pub const MIN_STREAM_RATE: f32 = 100.0;

/// Shortest move duration worth planning, in seconds.
pub const MIN_STREAM_DURATION: f32 = 0.01;

/// A planned streaming move.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamMove {
    /// Target in steps.
    pub target: i64,
    /// Cruise speed in steps/s.
    pub speed: f32,
    /// Acceleration and deceleration in steps/s².
    pub acceleration: f32,
    /// The requested target was out of reach and was pulled closer.
    pub shortened: bool,
}

/// Plan a move from `position` to `target` taking `duration_s` seconds.
///
/// Returns `None` when there is nothing worth doing: a duration under
/// [`MIN_STREAM_DURATION`] or a distance of at most one step.
pub fn plan_stream_move(
    position: i64,
    target: i64,
    duration_s: f32,
    max_speed: f32,
    max_acceleration: f32,
) -> Option<StreamMove> {
    let mut distance = (target - position).unsigned_abs() as f32;
    if !(duration_s > MIN_STREAM_DURATION) || distance <= 1.0 {
        return None;
    }

    let half = duration_s / 2.0;
    let reachable = (max_acceleration * half * half).min(max_speed * duration_s);

    let mut target = target;
    let shortened = distance > reachable;
    if shortened {
        debug!("stream move too fast, shortening {} -> {}", distance, reachable);
        distance = reachable.max(0.0);
        let step = distance as i64;
        target = if target > position {
            position + step
        } else {
            position - step
        };
    }

    let speed = (2.0 * distance / duration_s)
        .max(MIN_STREAM_RATE)
        .min(max_speed);

    // Share of the move spent accelerating plus braking.
    let vt = speed * duration_s;
    let proportion = (-(2.0 * distance - 2.0 * vt) / vt).max(0.01);
    let acceleration = (speed / (duration_s * proportion / 2.0))
        .max(MIN_STREAM_RATE)
        .min(max_acceleration);

    Some(StreamMove {
        target,
        speed,
        acceleration,
        shortened,
    })
}

/// Map a stream position in percent onto the stroke window
/// `[depth - stroke, depth]`. Out-of-range percentages are clamped.
pub fn stream_target(percent: f32, depth: i64, stroke: i64) -> i64 {
    let percent = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    let back = depth - stroke;
    back + (stroke as f32 * percent / 100.0) as i64
}
