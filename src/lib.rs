//! # stroke-motion
//!
//! Motion control for a reciprocating linear axis driven by a step/direction
//! stepper driver, with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Step timing**: trapezoidal profiles with independent acceleration and
//!   deceleration, re-planned on the fly when the target or speed changes
//! - **Safety**: emergency stop with optional hold, limit switches, homing
//!   against an endstop, soft travel limits with a keepout at both ends
//! - **Patterns**: a catalogue of stroke patterns driven by depth, stroke,
//!   speed and sensation
//! - **Session** (`std`): a step loop and a pattern loop sharing one axis,
//!   with parameter changes from any thread, setup moves and position
//!   streaming
//! - **Configuration-driven**: machine description in a TOML file
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stroke_motion::{AxisControllerBuilder, Endstop, MonotonicClock, StrokeEngine};
//!
//! let config = stroke_motion::load_config("machine.toml")?;
//!
//! let axis = AxisControllerBuilder::new()
//!     .from_config(&config)
//!     .step_pin(step_pin)
//!     .dir_pin(dir_pin)
//!     .clock(MonotonicClock::new())
//!     .build()?;
//!
//! let runtime = StrokeEngine::new(axis, Endstop::new(switch_pin, true), &config)?.spawn()?;
//! let handle = runtime.handle();
//!
//! handle.enable_and_home(&config.endstop.unwrap_or_default(), 0.0);
//! // wait for EngineEvent::HomingComplete(true) on runtime.events()
//! handle.set_depth(120.0, false);
//! handle.set_stroke(80.0, false);
//! handle.set_speed(40.0, false);
//! handle.start_pattern();
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): file I/O, TOML parsing, the threaded session and host
//!   simulation helpers
//! - `defmt`: defmt logging for embedded targets instead of `log`

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[macro_use]
mod fmt;

// Core modules
pub mod axis;
pub mod config;
pub mod error;
pub mod motion;
pub mod pattern;
#[cfg(feature = "std")]
pub mod session;

// Re-exports for ergonomic API
pub use axis::{
    AxisController, AxisControllerBuilder, AxisEvent, AxisState, Clock, Endstop, HomeSwitch,
    HomingProcedure, HomingStatus, LimitSwitch, NoPin, SwitchFn,
};
pub use config::{validate_config, EndstopConfig, MachineConfig, MotionLimits};
pub use error::{AxisError, ConfigError, Error, PatternError, Result};
pub use motion::{Direction, MotionPhase, StepTiming};
pub use pattern::{pattern_count, pattern_name, MotionCommand, Pattern, PatternKind};

#[cfg(feature = "std")]
pub use axis::MonotonicClock;
#[cfg(feature = "std")]
pub use session::{EngineEvent, EngineHandle, EngineRuntime, SessionState, StrokeEngine};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Millimeters, MillimetersPerSec, MillimetersPerSecSquared, Steps};
