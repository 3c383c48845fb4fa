//! Step/direction axis: controller, homing, brake and hardware seams.

mod brake;
mod builder;
mod controller;
mod hal;
mod homing;
#[cfg(feature = "std")]
pub mod sim;
mod state;

pub use brake::Brake;
pub use builder::AxisControllerBuilder;
pub use controller::{AxisController, MAX_AXIS_EVENTS, SEEK_DISTANCE};
#[cfg(feature = "std")]
pub use hal::MonotonicClock;
pub use hal::{Clock, Endstop, HomeSwitch, NoPin, SwitchFn};
pub use homing::{HomingProcedure, HomingStatus, HOMING_SETTLE_MS, REAPPROACH_SPEED_DIVISOR};
pub use state::{AxisEvent, AxisState, LimitSwitch};
