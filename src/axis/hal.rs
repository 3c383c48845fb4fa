//! Hardware seams of the axis.
//!
//! Step, direction, enable and brake outputs are embedded-hal
//! [`OutputPin`]s; switches are [`InputPin`]s wrapped in [`Endstop`]. Time
//! comes from a monotonic [`Clock`]. Every call here must be non-blocking.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::error::AxisError;

use super::state::AxisState;

/// Monotonic time source.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin.
    fn now_micros(&self) -> u64;

    /// Milliseconds since the same origin.
    fn now_millis(&self) -> u64 {
        self.now_micros() / 1000
    }
}

/// Placeholder for an output the axis does not have (enable or brake).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Drive an output to a logic level, mapping the pin error.
pub(crate) fn write_level<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), AxisError> {
    if high {
        pin.set_high().map_err(|_| AxisError::PinError)
    } else {
        pin.set_low().map_err(|_| AxisError::PinError)
    }
}

/// A switch the homing procedure can probe.
///
/// The probe receives the axis state so that simulated switches can trigger
/// on position; hardware switches ignore it.
pub trait HomeSwitch {
    /// Check if the switch is currently triggered.
    fn is_triggered(&mut self, axis: &AxisState) -> Result<bool, AxisError>;
}

impl<T: HomeSwitch + ?Sized> HomeSwitch for &mut T {
    fn is_triggered(&mut self, axis: &AxisState) -> Result<bool, AxisError> {
        (**self).is_triggered(axis)
    }
}

/// A physical endstop on an input pin.
#[derive(Debug)]
pub struct Endstop<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> Endstop<P> {
    /// Wrap an input pin. Mechanical switches with pull-ups are active low.
    pub fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    /// Release the pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin> HomeSwitch for Endstop<P> {
    fn is_triggered(&mut self, _axis: &AxisState) -> Result<bool, AxisError> {
        let low = self.pin.is_low().map_err(|_| AxisError::PinError)?;
        Ok(low == self.active_low)
    }
}

/// A switch whose state is computed from the axis state.
#[derive(Debug, Clone, Copy)]
pub struct SwitchFn<F>(pub F);

impl<F: FnMut(&AxisState) -> bool> HomeSwitch for SwitchFn<F> {
    fn is_triggered(&mut self, axis: &AxisState) -> Result<bool, AxisError> {
        Ok((self.0)(axis))
    }
}

/// Wall-clock monotonic time from [`std::time::Instant`].
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for MonotonicClock {
    fn now_micros(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}
