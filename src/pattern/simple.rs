use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{trapezoid, MotionCommand, Pattern, StrokeParams};

/// Plain trapezoidal stroke: a third accelerating, a third cruising, a third
/// braking, with equal in and out times.
///
/// Sensation moves each turnaround point by a random offset of up to
/// `min(depth, stroke) / 2 · |sensation| / 100` steps.
#[derive(Debug, Clone)]
pub struct SimpleStroke {
    params: StrokeParams,
    rng: SmallRng,
}

impl SimpleStroke {
    /// Create the pattern with a seeded jitter source.
    pub fn new(seed: u64) -> Self {
        Self {
            params: StrokeParams::default(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn jitter(&mut self) -> i64 {
        let p = &self.params;
        let bound = p.depth.min(p.stroke) as f32 / 2.0 * libm::fabsf(p.sensation) / 100.0;
        let bound = bound as i64;
        if bound > 0 {
            self.rng.gen_range(-bound..=bound)
        } else {
            0
        }
    }
}

impl Pattern for SimpleStroke {
    fn name(&self) -> &'static str {
        "Simple Stroke"
    }

    fn params(&self) -> &StrokeParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        &mut self.params
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionCommand {
        let (speed, acceleration) = trapezoid(self.params.stroke, self.params.half_time());
        let base = if index % 2 == 1 {
            self.params.back()
        } else {
            self.params.depth
        };

        MotionCommand {
            target: base + self.jitter(),
            speed,
            acceleration,
            skip: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(sensation: f32) -> SimpleStroke {
        let mut p = SimpleStroke::new(11);
        p.set_stroke(200);
        p.set_depth(500);
        p.set_time_of_stroke(1.0);
        p.set_sensation(sensation);
        p
    }

    #[test]
    fn test_neutral_targets_and_timing() {
        let mut p = pattern(0.0);
        let inward = p.next_target(0, 0);
        let outward = p.next_target(1, 0);

        assert_eq!(inward.target, 500);
        assert_eq!(outward.target, 300);
        assert_eq!(inward.speed, 600.0);
        assert_eq!(inward.acceleration, 3600.0);
        assert!(!inward.skip);
    }

    #[test]
    fn test_jitter_is_bounded() {
        let mut p = pattern(100.0);
        let mut moved = false;
        for index in 0..200 {
            let cmd = p.next_target(index, 0);
            let base = if index % 2 == 1 { 300 } else { 500 };
            assert!((cmd.target - base).abs() <= 100);
            moved |= cmd.target != base;
        }
        assert!(moved);
    }
}
