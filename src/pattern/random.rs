use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::math::fmap;
use super::{trapezoid, MotionCommand, Pattern, StrokeParams};

/// Resampling attempts before a target is accepted regardless of the gap.
pub const MAX_RESAMPLES: usize = 10;

/// Random turnaround points. In strokes land in the front half of the
/// stroke, out strokes in the back half.
///
/// A candidate closer than the minimum gap to the previous target is drawn
/// again, at most [`MAX_RESAMPLES`] times. The minimum gap grows from 0 to
/// half the stroke with sensation.
#[derive(Debug, Clone)]
pub struct RandomStroke {
    params: StrokeParams,
    rng: SmallRng,
    previous: Option<i64>,
}

impl RandomStroke {
    /// Create the pattern with a seeded source.
    pub fn new(seed: u64) -> Self {
        Self {
            params: StrokeParams::default(),
            rng: SmallRng::seed_from_u64(seed),
            previous: None,
        }
    }

    fn minimum_gap(&self) -> i64 {
        let half = self.params.stroke as f32 / 2.0;
        fmap(self.params.sensation.clamp(-100.0, 100.0), -100.0, 100.0, 0.0, half) as i64
    }

    fn sample(&mut self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        let gap = self.minimum_gap();
        let mut candidate = self.rng.gen_range(low..=high);
        if let Some(previous) = self.previous {
            let mut attempts = 0;
            while (candidate - previous).abs() < gap && attempts < MAX_RESAMPLES {
                candidate = self.rng.gen_range(low..=high);
                attempts += 1;
            }
        }
        candidate
    }
}

impl Pattern for RandomStroke {
    fn name(&self) -> &'static str {
        "Random Stroke"
    }

    fn params(&self) -> &StrokeParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        &mut self.params
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionCommand {
        if index == 0 {
            self.previous = None;
        }
        let back = self.params.back();
        let middle = back + self.params.stroke / 2;
        let target = if index % 2 == 1 {
            self.sample(back, middle)
        } else {
            self.sample(middle, self.params.depth)
        };

        let distance = match self.previous {
            Some(previous) => (target - previous).abs(),
            None => self.params.stroke / 2,
        };
        self.previous = Some(target);
        let (speed, acceleration) = trapezoid(distance, self.params.half_time());

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

    fn pattern(sensation: f32) -> RandomStroke {
        let mut p = RandomStroke::new(3);
        p.set_stroke(400);
        p.set_depth(1000);
        p.set_sensation(sensation);
        p
    }

    #[test]
    fn test_targets_stay_in_their_half() {
        let mut p = pattern(0.0);
        for index in 0..200 {
            let cmd = p.next_target(index, 0);
            if index % 2 == 1 {
                assert!((600..=800).contains(&cmd.target));
            } else {
                assert!((800..=1000).contains(&cmd.target));
            }
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = pattern(20.0);
        let mut b = pattern(20.0);
        for index in 0..50 {
            assert_eq!(a.next_target(index, 0), b.next_target(index, 0));
        }
    }

    #[test]
    fn test_speed_follows_distance() {
        let mut p = pattern(0.0);
        p.set_time_of_stroke(1.0);
        let first = p.next_target(0, 0);
        let second = p.next_target(1, 0);
        let distance = (first.target - second.target).abs();
        assert!((second.speed - 3.0 * distance as f32).abs() < 0.01);
    }
}
