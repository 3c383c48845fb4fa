use super::math::fscale;
use super::{MotionCommand, Pattern, StrokeParams};

/// Fraction of each half stroke spent accelerating: 1/3 at neutral, up to
/// 1/2 for positive sensation and down to 1/20 for negative.
fn acceleration_fraction(sensation: f32) -> f32 {
    if sensation >= 0.0 {
        fscale(0.0, 100.0, 1.0 / 3.0, 0.5, sensation, 0.0)
    } else {
        fscale(0.0, 100.0, 1.0 / 3.0, 0.05, -sensation, 0.0)
    }
}

/// Stroke whose acceleration phase is shaped by sensation, from near
/// constant speed (robotic) to a pure triangle profile.
#[derive(Debug, Clone)]
pub struct RoboStroke {
    params: StrokeParams,
    fraction: f32,
}

impl RoboStroke {
    /// Create the pattern.
    pub fn new() -> Self {
        Self {
            params: StrokeParams::default(),
            fraction: acceleration_fraction(0.0),
        }
    }
}

impl Default for RoboStroke {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern for RoboStroke {
    fn name(&self) -> &'static str {
        "Robo Stroke"
    }

    fn params(&self) -> &StrokeParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        &mut self.params
    }

    fn parameters_changed(&mut self) {
        self.fraction = acceleration_fraction(self.params.sensation);
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionCommand {
        let time = self.params.half_time();
        let speed = self.params.stroke as f32 / ((1.0 - self.fraction) * time);
        let acceleration = speed / (self.fraction * time);

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
