//! Holding-brake output with deferred engage and release.

use embedded_hal::digital::OutputPin;

use crate::config::BrakeConfig;
use crate::error::AxisError;

use super::hal::write_level;

/// Brake output plus its pending deadlines.
#[derive(Debug)]
pub struct Brake<P> {
    pin: P,
    config: BrakeConfig,
    active: bool,
    engage_at_ms: Option<u64>,
    release_at_ms: Option<u64>,
    moved_since_release: bool,
}

impl<P: OutputPin> Brake<P> {
    /// Take the pin and drive it to the released level.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin cannot be written.
    pub fn new(pin: P, config: BrakeConfig) -> Result<Self, AxisError> {
        let mut brake = Self {
            pin,
            config,
            active: false,
            engage_at_ms: None,
            release_at_ms: None,
            moved_since_release: false,
        };
        brake.deactivate()?;
        Ok(brake)
    }

    /// Engage now and cancel a pending engage.
    pub fn activate(&mut self) -> Result<(), AxisError> {
        write_level(&mut self.pin, !self.config.active_low)?;
        self.active = true;
        self.engage_at_ms = None;
        Ok(())
    }

    /// Release now and cancel a pending release.
    pub fn deactivate(&mut self) -> Result<(), AxisError> {
        write_level(&mut self.pin, self.config.active_low)?;
        self.active = false;
        self.release_at_ms = None;
        self.moved_since_release = false;
        Ok(())
    }

    /// Check if engaged.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Check if a step was taken since the last release.
    #[inline]
    pub fn moved_since_release(&self) -> bool {
        self.moved_since_release
    }

    /// Record that a step was taken.
    #[inline]
    pub(crate) fn note_movement(&mut self) {
        self.moved_since_release = true;
    }

    /// Fire any deadline that has passed. An engage deadline takes priority.
    pub fn poll(&mut self, now_ms: u64) -> Result<(), AxisError> {
        match (self.engage_at_ms, self.release_at_ms) {
            (Some(at), _) if at <= now_ms => self.activate(),
            (_, Some(at)) if at <= now_ms => self.deactivate(),
            _ => Ok(()),
        }
    }

    /// Engage after the axis comes to rest, honoring the configured delays.
    ///
    /// Does nothing while already engaged or with an engage pending.
    pub fn engage_after_stop(&mut self, now_ms: u64) -> Result<(), AxisError> {
        if self.active || self.engage_at_ms.is_some() {
            return Ok(());
        }
        if let Some(delay) = self.config.release_delay_ms {
            if delay > 0 && self.moved_since_release {
                self.release_at_ms = Some(now_ms + delay);
            }
        }
        if self.config.engage_delay_ms == 0 {
            self.activate()
        } else {
            self.engage_at_ms = Some(now_ms + self.config.engage_delay_ms);
            Ok(())
        }
    }
}
