//! Stroke patterns.
//!
//! A pattern turns the stroke parameters (depth, stroke, time of a full
//! stroke, sensation) into one [`MotionCommand`] per half stroke. Even
//! indices move in toward `depth`; odd indices move out toward
//! `depth - stroke`. All positions are in steps and already inside the
//! machine envelope; the session clamps whatever a pattern returns anyway.
//!
//! The catalogue is closed: [`PatternKind`] holds one variant per pattern and
//! dispatches to it. Catalogue order is the public index order.

mod deeper;
mod halfnhalf;
mod insist;
pub mod math;
mod random;
mod robo;
mod simple;
mod stopngo;
mod teasing;

pub use deeper::{Deeper, ProgressiveStroke};
pub use halfnhalf::HalfNHalf;
pub use insist::Insist;
pub use random::RandomStroke;
pub use robo::RoboStroke;
pub use simple::SimpleStroke;
pub use stopngo::StopNGo;
pub use teasing::TeasingPounding;

use crate::error::PatternError;

/// Catalogue names in index order.
pub const PATTERN_NAMES: [&str; 9] = [
    "Simple Stroke",
    "Teasing or Pounding",
    "Robo Stroke",
    "Half'n'Half",
    "Deeper",
    "Stop'n'Go",
    "Insist",
    "Progressive Stroke",
    "Random Stroke",
];

/// Number of patterns in the catalogue.
#[inline]
pub fn pattern_count() -> usize {
    PATTERN_NAMES.len()
}

/// Catalogue name at `index`.
#[inline]
pub fn pattern_name(index: usize) -> Option<&'static str> {
    PATTERN_NAMES.get(index).copied()
}

/// One move produced by a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionCommand {
    /// Absolute target in steps.
    pub target: i64,
    /// Cruise speed in steps/s.
    pub speed: f32,
    /// Acceleration (and deceleration) in steps/s².
    pub acceleration: f32,
    /// No move this time; ask again later.
    pub skip: bool,
}

/// Parameters every pattern receives, in steps and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeParams {
    /// Stroke length in steps.
    pub stroke: i64,
    /// Deepest position in steps.
    pub depth: i64,
    /// Duration of a full in-and-out stroke in seconds.
    pub time_of_stroke: f32,
    /// Pattern-specific modifier, -100..100 with 0 neutral.
    pub sensation: f32,
    /// Machine speed limit in steps/s.
    pub max_speed: f32,
    /// Machine acceleration limit in steps/s².
    pub max_acceleration: f32,
    /// Steps per millimeter.
    pub steps_per_mm: f32,
}

impl Default for StrokeParams {
    fn default() -> Self {
        Self {
            stroke: 0,
            depth: 0,
            time_of_stroke: 1.0,
            sensation: 0.0,
            max_speed: 0.0,
            max_acceleration: 0.0,
            steps_per_mm: 1.0,
        }
    }
}

impl StrokeParams {
    /// Duration of one half stroke.
    #[inline]
    pub fn half_time(&self) -> f32 {
        0.5 * self.time_of_stroke
    }

    /// The out position, `depth - stroke`.
    #[inline]
    pub fn back(&self) -> i64 {
        self.depth - self.stroke
    }
}

/// Speed and acceleration of a 1/3 accelerate, 1/3 cruise, 1/3 brake move
/// covering `distance` steps in `time` seconds.
pub(crate) fn trapezoid(distance: i64, time: f32) -> (f32, f32) {
    let speed = 1.5 * distance as f32 / time;
    (speed, 3.0 * speed / time)
}

/// Behaviour shared by all patterns.
pub trait Pattern {
    /// Catalogue name.
    fn name(&self) -> &'static str;

    /// Current parameters.
    fn params(&self) -> &StrokeParams;

    /// Mutable parameters. Call [`parameters_changed`](Self::parameters_changed)
    /// after writing through this.
    fn params_mut(&mut self) -> &mut StrokeParams;

    /// Recompute anything the pattern derives from its parameters.
    fn parameters_changed(&mut self) {}

    /// Set the duration of a full stroke in seconds.
    fn set_time_of_stroke(&mut self, seconds: f32) {
        self.params_mut().time_of_stroke = seconds;
        self.parameters_changed();
    }

    /// Set the stroke length in steps.
    fn set_stroke(&mut self, steps: i64) {
        self.params_mut().stroke = steps;
        self.parameters_changed();
    }

    /// Set the depth in steps.
    fn set_depth(&mut self, steps: i64) {
        self.params_mut().depth = steps;
        self.parameters_changed();
    }

    /// Set the sensation (-100..100).
    fn set_sensation(&mut self, sensation: f32) {
        self.params_mut().sensation = sensation;
        self.parameters_changed();
    }

    /// Tell the pattern what the machine can do.
    fn set_speed_limit(&mut self, max_speed: f32, max_acceleration: f32, steps_per_mm: f32) {
        let params = self.params_mut();
        params.max_speed = max_speed;
        params.max_acceleration = max_acceleration;
        params.steps_per_mm = steps_per_mm;
        self.parameters_changed();
    }

    /// Produce the move for half stroke `index`.
    ///
    /// `now_ms` is a monotonic millisecond clock, used by patterns that
    /// pause between strokes.
    fn next_target(&mut self, index: u32, now_ms: u64) -> MotionCommand;
}

/// The closed pattern catalogue.
#[derive(Debug, Clone)]
pub enum PatternKind {
    /// See [`SimpleStroke`].
    SimpleStroke(SimpleStroke),
    /// See [`TeasingPounding`].
    TeasingPounding(TeasingPounding),
    /// See [`RoboStroke`].
    RoboStroke(RoboStroke),
    /// See [`HalfNHalf`].
    HalfNHalf(HalfNHalf),
    /// See [`Deeper`].
    Deeper(Deeper),
    /// See [`StopNGo`].
    StopNGo(StopNGo),
    /// See [`Insist`].
    Insist(Insist),
    /// See [`ProgressiveStroke`].
    ProgressiveStroke(ProgressiveStroke),
    /// See [`RandomStroke`].
    RandomStroke(RandomStroke),
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            PatternKind::SimpleStroke($p) => $body,
            PatternKind::TeasingPounding($p) => $body,
            PatternKind::RoboStroke($p) => $body,
            PatternKind::HalfNHalf($p) => $body,
            PatternKind::Deeper($p) => $body,
            PatternKind::StopNGo($p) => $body,
            PatternKind::Insist($p) => $body,
            PatternKind::ProgressiveStroke($p) => $body,
            PatternKind::RandomStroke($p) => $body,
        }
    };
}

impl PatternKind {
    /// Create the pattern at catalogue `index`.
    ///
    /// `seed` initialises patterns that use bounded randomness.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::UnknownIndex`] past the end of the catalogue.
    pub fn from_index(index: usize, seed: u64) -> Result<Self, PatternError> {
        let pattern = match index {
            0 => PatternKind::SimpleStroke(SimpleStroke::new(seed)),
            1 => PatternKind::TeasingPounding(TeasingPounding::new()),
            2 => PatternKind::RoboStroke(RoboStroke::new()),
            3 => PatternKind::HalfNHalf(HalfNHalf::new()),
            4 => PatternKind::Deeper(Deeper::new()),
            5 => PatternKind::StopNGo(StopNGo::new()),
            6 => PatternKind::Insist(Insist::new()),
            7 => PatternKind::ProgressiveStroke(ProgressiveStroke::new()),
            8 => PatternKind::RandomStroke(RandomStroke::new(seed)),
            _ => return Err(PatternError::UnknownIndex(index)),
        };
        Ok(pattern)
    }

    /// Create a pattern by catalogue name.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::UnknownName`] for a name not in the catalogue.
    pub fn from_name(name: &str, seed: u64) -> Result<Self, PatternError> {
        match Self::index_of(name) {
            Some(index) => Self::from_index(index, seed),
            None => Err(PatternError::UnknownName(crate::error::bounded(name))),
        }
    }

    /// Catalogue index of `name`.
    pub fn index_of(name: &str) -> Option<usize> {
        PATTERN_NAMES.iter().position(|n| *n == name)
    }

    /// Catalogue index of this pattern.
    pub fn index(&self) -> usize {
        match self {
            PatternKind::SimpleStroke(_) => 0,
            PatternKind::TeasingPounding(_) => 1,
            PatternKind::RoboStroke(_) => 2,
            PatternKind::HalfNHalf(_) => 3,
            PatternKind::Deeper(_) => 4,
            PatternKind::StopNGo(_) => 5,
            PatternKind::Insist(_) => 6,
            PatternKind::ProgressiveStroke(_) => 7,
            PatternKind::RandomStroke(_) => 8,
        }
    }

    /// Replace this pattern with the one at `index`, carrying the parameters
    /// over.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::UnknownIndex`] past the end of the catalogue;
    /// the current pattern is kept.
    pub fn switch_to(&mut self, index: usize, seed: u64) -> Result<(), PatternError> {
        let params = *self.params();
        let mut next = Self::from_index(index, seed)?;
        *next.params_mut() = params;
        next.parameters_changed();
        *self = next;
        Ok(())
    }
}

impl Pattern for PatternKind {
    fn name(&self) -> &'static str {
        dispatch!(self, p => p.name())
    }

    fn params(&self) -> &StrokeParams {
        dispatch!(self, p => p.params())
    }

    fn params_mut(&mut self) -> &mut StrokeParams {
        dispatch!(self, p => p.params_mut())
    }

    fn parameters_changed(&mut self) {
        dispatch!(self, p => p.parameters_changed())
    }

    fn next_target(&mut self, index: u32, now_ms: u64) -> MotionCommand {
        dispatch!(self, p => p.next_target(index, now_ms))
    }
}
