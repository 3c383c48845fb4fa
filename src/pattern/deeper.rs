use super::math::map_range;
use super::{trapezoid, MotionCommand, Pattern, StrokeParams};

/// Strokes per ramp: 2..11 for negative sensation, 11..32 for positive.
pub(crate) fn ramp_length(sensation: f32) -> i64 {
    let s = sensation as i64;
    if sensation < 0.0 {
        map_range(s, -100, 0, 2, 11)
    } else {
        map_range(s, 0, 100, 11, 32)
    }
}

/// Position of full stroke `index / 2` inside its ramp, 1-based.
fn ramp_step(index: u32, ramp: i64) -> i64 {
    (index as i64 / 2) % ramp + 1
}

/// Insertion depth grows with every stroke until the full stroke is reached,
/// then starts over. Sensation sets the number of strokes per ramp.
#[derive(Debug, Clone)]
pub struct Deeper {
    params: StrokeParams,
    ramp: i64,
}

impl Deeper {
    /// Create the pattern.
    pub fn new() -> Self {
        Self {
            params: StrokeParams::default(),
            ramp: ramp_length(0.0),
        }
    }

    /// Strokes per ramp.
    pub fn ramp_length(&self) -> i64 {
        self.ramp
    }
}

impl Default for Deeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern for Deeper {
    fn name(&self) -> &'static str {
        "Deeper"
    }

    fn params(&self) -> &StrokeParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        &mut self.params
    }

    fn parameters_changed(&mut self) {
        self.ramp = ramp_length(self.params.sensation);
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionCommand {
        let slope = self.params.stroke / self.ramp;
        let amplitude = slope * ramp_step(index, self.ramp);
        let (speed, acceleration) = trapezoid(amplitude, self.params.half_time());

        MotionCommand {
            target: if index % 2 == 1 {
                self.params.back()
            } else {
                self.params.back() + amplitude
            },
            speed,
            acceleration,
            skip: false,
        }
    }
}

/// Full-length strokes whose speed ramps up from slow to the set speed over
/// a sensation-controlled number of strokes, then drops back to slow.
#[derive(Debug, Clone)]
pub struct ProgressiveStroke {
    params: StrokeParams,
    ramp: i64,
}

impl ProgressiveStroke {
    /// Create the pattern.
    pub fn new() -> Self {
        Self {
            params: StrokeParams::default(),
            ramp: ramp_length(0.0),
        }
    }
}

impl Default for ProgressiveStroke {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern for ProgressiveStroke {
    fn name(&self) -> &'static str {
        "Progressive Stroke"
    }

    fn params(&self) -> &StrokeParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        &mut self.params
    }

    fn parameters_changed(&mut self) {
        self.ramp = ramp_length(self.params.sensation);
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionCommand {
        let step = ramp_step(index, self.ramp);
        let time = self.params.half_time() * self.ramp as f32 / step as f32;
        let (speed, acceleration) = trapezoid(self.params.stroke, time);

        MotionCommand {
            target: if index % 2 == 1 {
                self.params.back()
            } else {
                self.params.depth
            },
            speed,
            acceleration,
            skip: false,
        }
    }
}
