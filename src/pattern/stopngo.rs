use super::math::map_range;
use super::{trapezoid, MotionCommand, Pattern, StrokeParams};

const MAX_SERIES: i64 = 5;

/// Series of 1, 2, .. 5, 4, .. 1 strokes separated by pauses. Sensation sets
/// the pause from 100 ms to 10 s. Returns `skip` while pausing.
#[derive(Debug, Clone)]
pub struct StopNGo {
    params: StrokeParams,
    pause_ms: u64,
    pause_started_ms: Option<u64>,
    series_length: i64,
    strokes_in_series: i64,
    counting_up: bool,
}

impl StopNGo {
    /// Create the pattern.
    pub fn new() -> Self {
        Self {
            params: StrokeParams::default(),
            pause_ms: Self::pause_for(0.0),
            pause_started_ms: None,
            series_length: 1,
            strokes_in_series: 0,
            counting_up: true,
        }
    }

    fn pause_for(sensation: f32) -> u64 {
        map_range(sensation as i64, -100, 100, 100, 10_000).max(0) as u64
    }

    /// Pause between series in milliseconds.
    pub fn pause_ms(&self) -> u64 {
        self.pause_ms
    }

    fn pausing(&self, now_ms: u64) -> bool {
        match self.pause_started_ms {
            Some(start) => now_ms <= start + self.pause_ms,
            None => false,
        }
    }
}

impl Default for StopNGo {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern for StopNGo {
    fn name(&self) -> &'static str {
        "Stop'n'Go"
    }

    fn params(&self) -> &StrokeParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        &mut self.params
    }

    fn parameters_changed(&mut self) {
        self.pause_ms = Self::pause_for(self.params.sensation);
    }

    fn next_target(&mut self, index: u32, now_ms: u64) -> MotionCommand {
        let (speed, acceleration) = trapezoid(self.params.stroke, self.params.half_time());
        let mut command = MotionCommand {
            target: self.params.depth,
            speed,
            acceleration,
            skip: false,
        };

        if self.pausing(now_ms) {
            command.skip = true;
            return command;
        }
        self.pause_started_ms = None;

        if index % 2 == 1 {
            command.target = self.params.back();
            if self.strokes_in_series >= self.series_length {
                self.strokes_in_series = 0;
                if self.series_length >= MAX_SERIES {
                    self.counting_up = false;
                }
                if self.series_length <= 1 {
                    self.counting_up = true;
                }
                self.series_length += if self.counting_up { 1 } else { -1 };
                self.pause_started_ms = Some(now_ms);
            }
        } else {
            self.strokes_in_series += 1;
        }

        command
    }
}
