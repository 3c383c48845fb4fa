use super::{trapezoid, MotionCommand, Pattern, StrokeParams};

const MIN_FRACTION: f32 = 0.01;

/// Short strokes at full-stroke speed.
///
/// Sensation shortens the stroke to `(100 - |sensation|)` percent while the
/// speed stays that of the full stroke. Positive sensation keeps the short
/// strokes at the front (toward depth), negative at the back.
#[derive(Debug, Clone)]
pub struct Insist {
    params: StrokeParams,
    speed: f32,
    acceleration: f32,
    real_stroke: i64,
    fraction: f32,
    in_front: bool,
}

impl Insist {
    /// Create the pattern.
    pub fn new() -> Self {
        let mut pattern = Self {
            params: StrokeParams::default(),
            speed: 0.0,
            acceleration: 0.0,
            real_stroke: 0,
            fraction: 1.0,
            in_front: false,
        };
        pattern.parameters_changed();
        pattern
    }

    /// Length of the shortened stroke in steps.
    pub fn real_stroke(&self) -> i64 {
        self.real_stroke
    }
}

impl Default for Insist {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern for Insist {
    fn name(&self) -> &'static str {
        "Insist"
    }

    fn params(&self) -> &StrokeParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        &mut self.params
    }

    fn parameters_changed(&mut self) {
        let sensation = self.params.sensation;
        self.fraction = ((100.0 - libm::fabsf(sensation)) / 100.0).max(MIN_FRACTION);
        self.in_front = sensation > 0.0;

        let time = self.params.half_time();
        let (speed, _) = trapezoid(self.params.stroke, time);
        self.speed = speed;
        self.acceleration = 3.0 * speed / (time * self.fraction);
        self.real_stroke = (self.params.stroke as f32 * self.fraction) as i64;
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionCommand {
        let p = &self.params;
        let outward = index % 2 == 1;
        let target = match (self.in_front, outward) {
            (true, true) => p.depth - self.real_stroke,
            (true, false) => p.depth,
            (false, true) => p.back(),
            (false, false) => p.back() + self.real_stroke,
        };

        MotionCommand {
            target,
            speed: self.speed,
            acceleration: self.acceleration,
            skip: false,
        }
    }
}
