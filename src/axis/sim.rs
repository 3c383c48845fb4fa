//! Host simulation of axis hardware.
//!
//! [`SimClock`] advances by a fixed quantum on every read so that a loop
//! polling the axis makes progress in simulated time. [`SimPin`] records its
//! level and rising edges and can double as an input.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use super::hal::Clock;

/// Simulated monotonic clock shared between clones.
#[derive(Debug, Clone)]
pub struct SimClock {
    now_us: Arc<AtomicU64>,
    tick_us: u64,
}

impl SimClock {
    /// Create a clock starting at 0 that advances `tick_us` per read.
    pub fn new(tick_us: u64) -> Self {
        Self {
            now_us: Arc::new(AtomicU64::new(0)),
            tick_us,
        }
    }

    /// Jump forward without reading.
    pub fn advance(&self, us: u64) {
        self.now_us.fetch_add(us, Ordering::Relaxed);
    }

    /// Current time without advancing.
    pub fn peek_micros(&self) -> u64 {
        self.now_us.load(Ordering::Relaxed)
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Clock for SimClock {
    fn now_micros(&self) -> u64 {
        self.now_us.fetch_add(self.tick_us, Ordering::Relaxed) + self.tick_us
    }
}

#[derive(Debug, Default)]
struct PinState {
    high: AtomicBool,
    rising_edges: AtomicU32,
}

/// Simulated digital pin shared between clones.
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    state: Arc<PinState>,
}

impl SimPin {
    /// Create a pin that starts low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the last written level.
    pub fn is_set_high(&self) -> bool {
        self.state.high.load(Ordering::Relaxed)
    }

    /// Number of low-to-high transitions written so far.
    pub fn rising_edges(&self) -> u32 {
        self.state.rising_edges.load(Ordering::Relaxed)
    }

    /// Drive the level from outside, for use as an input.
    pub fn set_level(&self, high: bool) {
        self.state.high.store(high, Ordering::Relaxed);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.high.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.state.high.swap(true, Ordering::Relaxed) {
            self.state.rising_edges.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.is_set_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.is_set_high())
    }
}
