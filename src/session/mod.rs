//! Stroke session: runs patterns, setup moves and streamed positions on one
//! axis while callers change parameters from other threads.
//!
//! Two loops share the work. The step loop owns the [`AxisController`] and
//! is the only code that drives it; it must never block. The pattern loop
//! asks the selected pattern for the next half stroke whenever the previous
//! one has completed and queues it for the step loop. Callers use an
//! [`EngineHandle`] and observe the session through [`EngineEvent`]s.
//!
//! [`AxisController`]: crate::axis::AxisController

mod engine;
mod event;
mod handle;
mod parameters;
mod pattern_loop;
mod shared;
mod state;
mod step_loop;
mod streaming;

pub use engine::{EngineRuntime, StrokeEngine};
pub use event::EngineEvent;
pub use handle::EngineHandle;
pub use parameters::{MAX_TIME_OF_STROKE, MIN_TIME_OF_STROKE};
pub use pattern_loop::PATTERN_TICK_MS;
pub use state::SessionState;
pub use streaming::{plan_stream_move, stream_target, StreamMove, MIN_STREAM_DURATION, MIN_STREAM_RATE};
