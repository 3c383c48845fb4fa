use super::teasing::split_stroke_time;
use super::{trapezoid, MotionCommand, Pattern, StrokeParams};

/// Teasing or Pounding timing, but every other stroke only goes half way in.
/// The very first stroke is a half one.
#[derive(Debug, Clone)]
pub struct HalfNHalf {
    params: StrokeParams,
    time_in: f32,
    time_out: f32,
    half: bool,
}

impl HalfNHalf {
    /// Create the pattern.
    pub fn new() -> Self {
        let params = StrokeParams::default();
        let (time_in, time_out) = split_stroke_time(params.time_of_stroke, params.sensation);
        Self {
            params,
            time_in,
            time_out,
            half: true,
        }
    }
}

impl Default for HalfNHalf {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern for HalfNHalf {
    fn name(&self) -> &'static str {
        "Half'n'Half"
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
        if index == 0 {
            self.half = true;
        }
        let stroke = if self.half {
            self.params.stroke / 2
        } else {
            self.params.stroke
        };

        let (time, target) = if index % 2 == 1 {
            self.half = !self.half;
            (self.time_out, self.params.back())
        } else {
            (self.time_in, self.params.back() + stroke)
        };
        let (speed, acceleration) = trapezoid(stroke, time);

        MotionCommand {
            target,
            speed,
            acceleration,
            skip: false,
        }
    }
}
