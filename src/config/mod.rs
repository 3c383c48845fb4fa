//! Configuration module for stroke-motion.
//!
//! Provides types for loading and validating machine configuration from TOML
//! files (with `std` feature) or pre-parsed data, and for deriving the
//! step-domain motion envelope.

mod brake;
mod endstop;
mod limits;
#[cfg(feature = "std")]
mod loader;
mod motor;
mod system;
mod travel;
pub mod units;
mod validation;

pub use brake::BrakeConfig;
pub use endstop::EndstopConfig;
pub use limits::MotionLimits;
pub use motor::MotorConfig;
pub use system::{MachineConfig, StartupConfig};
pub use travel::TravelConfig;
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Millimeters, MillimetersPerSec, MillimetersPerSecSquared, Steps};
