use super::math::fscale;
use super::{trapezoid, MotionCommand, Pattern, StrokeParams};

/// In/out time split for a full stroke of `time_of_stroke` seconds.
///
/// The faster half takes `0.5·T / f` with `f` running from 1 to 5 as
/// `|sensation|` goes from 0 to 100; the slower half takes the rest. Positive
/// sensation makes the in stroke the fast one.
pub(crate) fn split_stroke_time(time_of_stroke: f32, sensation: f32) -> (f32, f32) {
    let fast = 0.5 * time_of_stroke / fscale(0.0, 100.0, 1.0, 5.0, libm::fabsf(sensation), 0.0);
    if sensation > 0.0 {
        (fast, time_of_stroke - fast)
    } else {
        (time_of_stroke - fast, fast)
    }
}

/// Full strokes with a sensation-controlled speed ratio between in and out.
/// The time of the whole stroke does not change.
#[derive(Debug, Clone)]
pub struct TeasingPounding {
    params: StrokeParams,
    time_in: f32,
    time_out: f32,
}

impl TeasingPounding {
    /// Create the pattern.
    pub fn new() -> Self {
        let params = StrokeParams::default();
        let (time_in, time_out) = split_stroke_time(params.time_of_stroke, params.sensation);
        Self {
            params,
            time_in,
            time_out,
        }
    }

    /// Seconds for the in and out halves.
    pub fn stroke_times(&self) -> (f32, f32) {
        (self.time_in, self.time_out)
    }
}

impl Default for TeasingPounding {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern for TeasingPounding {
    fn name(&self) -> &'static str {
        "Teasing or Pounding"
    }

    fn params(&self) -> &StrokeParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        &mut self.params
    }

    fn parameters_changed(&mut self) {
        let (time_in, time_out) =
            split_stroke_time(self.params.time_of_stroke, self.params.sensation);
        self.time_in = time_in;
        self.time_out = time_out;
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionCommand {
        let (time, target) = if index % 2 == 1 {
            (self.time_out, self.params.back())
        } else {
            (self.time_in, self.params.depth)
        };
        let (speed, acceleration) = trapezoid(self.params.stroke, time);

        MotionCommand {
            target,
            speed,
            acceleration,
            skip: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_split_is_even() {
        let (time_in, time_out) = split_stroke_time(2.0, 0.0);
        assert_eq!(time_in, 1.0);
        assert_eq!(time_out, 1.0);
    }

    #[test]
    fn test_pounding_makes_in_stroke_fast() {
        let mut p = TeasingPounding::new();
        p.set_stroke(300);
        p.set_depth(1000);
        p.set_time_of_stroke(2.0);
        p.set_sensation(100.0);

        let (time_in, time_out) = p.stroke_times();
        assert!((time_in - 0.2).abs() < 1e-5);
        assert!((time_out - 1.8).abs() < 1e-5);

        let inward = p.next_target(0, 0);
        let outward = p.next_target(1, 0);
        assert_eq!(inward.target, 1000);
        assert_eq!(outward.target, 700);
        assert!(inward.speed > outward.speed * 8.0);
    }

    #[test]
    fn test_teasing_makes_out_stroke_fast() {
        let mut p = TeasingPounding::new();
        p.set_stroke(300);
        p.set_depth(1000);
        p.set_sensation(-100.0);

        let (time_in, time_out) = p.stroke_times();
        assert!(time_out < time_in);
    }
}
