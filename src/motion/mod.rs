//! Motion module for stroke-motion.
//!
//! Pure step-period kinematics. No I/O.

mod profile;

pub use profile::{Direction, MotionPhase, MotionProfileGenerator, StepDecision, StepTiming};
