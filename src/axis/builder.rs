//! Builder for [`AxisController`].

use embedded_hal::digital::OutputPin;

use crate::config::{BrakeConfig, MachineConfig};
use crate::error::{ConfigError, Error, Result};
use crate::motion::{Direction, StepTiming};

use super::brake::Brake;
use super::controller::AxisController;
use super::hal::{Clock, NoPin};

/// Builder for creating [`AxisController`] instances.
///
/// Enable and brake outputs are optional; supplying one changes the
/// corresponding type parameter away from [`NoPin`].
pub struct AxisControllerBuilder<STEP, DIR, CLK, EN = NoPin, BRK = NoPin> {
    step_pin: Option<STEP>,
    dir_pin: Option<DIR>,
    clock: Option<CLK>,
    enable_pin: EN,
    brake: Option<(BRK, BrakeConfig)>,
    steps_per_mm: f32,
    speed: Option<f32>,
    acceleration: Option<f32>,
    deceleration: Option<f32>,
    invert_direction: bool,
    enable_active_low: bool,
    direction_toward_home: Direction,
}

impl<STEP, DIR, CLK> Default for AxisControllerBuilder<STEP, DIR, CLK>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<STEP, DIR, CLK> AxisControllerBuilder<STEP, DIR, CLK, NoPin, NoPin>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
{
    /// Create a new builder with no enable pin and no brake.
    pub fn new() -> Self {
        Self {
            step_pin: None,
            dir_pin: None,
            clock: None,
            enable_pin: NoPin,
            brake: None,
            steps_per_mm: 1.0,
            speed: None,
            acceleration: None,
            deceleration: None,
            invert_direction: false,
            enable_active_low: true,
            direction_toward_home: Direction::Negative,
        }
    }
}

impl<STEP, DIR, CLK, EN, BRK> AxisControllerBuilder<STEP, DIR, CLK, EN, BRK>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
    EN: OutputPin,
    BRK: OutputPin,
{
    /// Set the STEP pin.
    pub fn step_pin(mut self, pin: STEP) -> Self {
        self.step_pin = Some(pin);
        self
    }

    /// Set the DIR pin.
    pub fn dir_pin(mut self, pin: DIR) -> Self {
        self.dir_pin = Some(pin);
        self
    }

    /// Set the time source.
    pub fn clock(mut self, clock: CLK) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Attach a driver enable output.
    pub fn enable_pin<E: OutputPin>(
        self,
        pin: E,
        active_low: bool,
    ) -> AxisControllerBuilder<STEP, DIR, CLK, E, BRK> {
        AxisControllerBuilder {
            step_pin: self.step_pin,
            dir_pin: self.dir_pin,
            clock: self.clock,
            enable_pin: pin,
            brake: self.brake,
            steps_per_mm: self.steps_per_mm,
            speed: self.speed,
            acceleration: self.acceleration,
            deceleration: self.deceleration,
            invert_direction: self.invert_direction,
            enable_active_low: active_low,
            direction_toward_home: self.direction_toward_home,
        }
    }

    /// Attach a brake output.
    pub fn brake<B: OutputPin>(
        self,
        pin: B,
        config: BrakeConfig,
    ) -> AxisControllerBuilder<STEP, DIR, CLK, EN, B> {
        AxisControllerBuilder {
            step_pin: self.step_pin,
            dir_pin: self.dir_pin,
            clock: self.clock,
            enable_pin: self.enable_pin,
            brake: Some((pin, config)),
            steps_per_mm: self.steps_per_mm,
            speed: self.speed,
            acceleration: self.acceleration,
            deceleration: self.deceleration,
            invert_direction: self.invert_direction,
            enable_active_low: self.enable_active_low,
            direction_toward_home: self.direction_toward_home,
        }
    }

    /// Set the steps per millimeter used by the mm-denominated setters.
    pub fn steps_per_mm(mut self, steps_per_mm: f32) -> Self {
        self.steps_per_mm = steps_per_mm;
        self
    }

    /// Set the cruise speed in steps/s.
    pub fn speed(mut self, steps_per_sec: f32) -> Self {
        self.speed = Some(steps_per_sec);
        self
    }

    /// Set the acceleration in steps/s².
    pub fn acceleration(mut self, steps_per_sec2: f32) -> Self {
        self.acceleration = Some(steps_per_sec2);
        self
    }

    /// Set the deceleration in steps/s². Defaults to the acceleration.
    pub fn deceleration(mut self, steps_per_sec2: f32) -> Self {
        self.deceleration = Some(steps_per_sec2);
        self
    }

    /// Set direction inversion.
    pub fn invert_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }

    /// Set the direction in which home lies.
    pub fn direction_toward_home(mut self, direction: Direction) -> Self {
        self.direction_toward_home = direction;
        self
    }

    /// Configure scale, rates and polarities from a machine configuration.
    ///
    /// Speed and rates are set to the machine maxima.
    pub fn from_config(mut self, config: &MachineConfig) -> Self {
        let limits = config.limits();
        self.steps_per_mm = limits.steps_per_mm;
        self.speed = Some(limits.max_step_per_second);
        self.acceleration = Some(limits.max_step_acceleration);
        self.deceleration = Some(limits.max_step_deceleration);
        self.invert_direction = config.motor.invert_direction;
        self.enable_active_low = config.motor.enable_active_low;
        if let Some(endstop) = &config.endstop {
            self.direction_toward_home = Direction::from_sign(endstop.direction_toward_switch() as i64);
        }
        self
    }

    /// Build the controller.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing, a rate is not
    /// positive, or the brake output cannot be initialised.
    pub fn build(self) -> Result<AxisController<STEP, DIR, EN, BRK, CLK>> {
        let step_pin = self
            .step_pin
            .ok_or(Error::Config(ConfigError::MissingField("step_pin")))?;
        let dir_pin = self
            .dir_pin
            .ok_or(Error::Config(ConfigError::MissingField("dir_pin")))?;
        let clock = self
            .clock
            .ok_or(Error::Config(ConfigError::MissingField("clock")))?;
        let speed = self
            .speed
            .ok_or(Error::Config(ConfigError::MissingField("speed")))?;
        let acceleration = self
            .acceleration
            .ok_or(Error::Config(ConfigError::MissingField("acceleration")))?;

        if !(self.steps_per_mm.is_finite() && self.steps_per_mm > 0.0) {
            return Err(ConfigError::InvalidStepsPerMillimeter(self.steps_per_mm).into());
        }

        let timing = StepTiming::new(
            speed,
            acceleration,
            self.deceleration.unwrap_or(acceleration),
        )?;

        let brake = match self.brake {
            Some((pin, config)) => Some(Brake::new(pin, config)?),
            None => None,
        };

        Ok(AxisController::new(
            step_pin,
            dir_pin,
            self.enable_pin,
            brake,
            clock,
            timing,
            self.steps_per_mm,
            self.invert_direction,
            self.enable_active_low,
            self.direction_toward_home,
        ))
    }
}
