//! Error types for stroke-motion.
//!
//! Only conditions that must stop a caller before motion starts are errors.
//! A homing timeout is an `Ok(false)` outcome, an invalid session transition
//! is a `false` return, and safety clipping is a telemetry flag.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all stroke-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Axis hardware or run-time parameter error
    Axis(AxisError),
    /// Pattern lookup error
    Pattern(PatternError),
}

/// Configuration-related errors.
///
/// All of these are fatal at setup and must be resolved before motion starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Steps per millimeter must be > 0
    InvalidStepsPerMillimeter(f32),
    /// Maximum speed must be > 0
    InvalidMaxSpeed(f32),
    /// Maximum acceleration must be > 0
    InvalidMaxAcceleration(f32),
    /// Maximum deceleration must be > 0
    InvalidMaxDeceleration(f32),
    /// Usable travel (physical travel minus both keepouts) must be > 0
    InvalidTravel {
        /// Physical travel in millimeters
        physical: f32,
        /// Keepout boundary in millimeters
        keepout: f32,
    },
    /// Homing speed must be > 0
    InvalidHomingSpeed(f32),
    /// Startup pattern name is not in the catalogue
    UnknownPattern(heapless::String<32>),
    /// A required builder field was not supplied
    MissingField(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Axis errors raised while driving outputs or changing run-time settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisError {
    /// Pin operation failed
    PinError,
    /// Speed must be finite and > 0 steps/s
    InvalidSpeed(f32),
    /// Acceleration must be finite and > 0 steps/s²
    InvalidAcceleration(f32),
    /// Deceleration must be finite and > 0 steps/s²
    InvalidDeceleration(f32),
}

/// Pattern lookup errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternError {
    /// No pattern at this catalogue index
    UnknownIndex(usize),
    /// No pattern with this name
    UnknownName(heapless::String<32>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Axis(e) => write!(f, "Axis error: {}", e),
            Error::Pattern(e) => write!(f, "Pattern error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidStepsPerMillimeter(v) => {
                write!(f, "Invalid steps per mm: {}. Must be > 0", v)
            }
            ConfigError::InvalidMaxSpeed(v) => write!(f, "Invalid max speed: {}. Must be > 0", v),
            ConfigError::InvalidMaxAcceleration(v) => {
                write!(f, "Invalid max acceleration: {}. Must be > 0", v)
            }
            ConfigError::InvalidMaxDeceleration(v) => {
                write!(f, "Invalid max deceleration: {}. Must be > 0", v)
            }
            ConfigError::InvalidTravel { physical, keepout } => write!(
                f,
                "Invalid travel: physical travel {} mm leaves no room inside keepout {} mm",
                physical, keepout
            ),
            ConfigError::InvalidHomingSpeed(v) => {
                write!(f, "Invalid homing speed: {}. Must be > 0", v)
            }
            ConfigError::UnknownPattern(name) => write!(f, "Unknown pattern '{}'", name),
            ConfigError::MissingField(field) => write!(f, "{} is required", field),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for AxisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisError::PinError => write!(f, "GPIO pin operation failed"),
            AxisError::InvalidSpeed(v) => write!(f, "Invalid speed {} steps/s", v),
            AxisError::InvalidAcceleration(v) => write!(f, "Invalid acceleration {} steps/s²", v),
            AxisError::InvalidDeceleration(v) => write!(f, "Invalid deceleration {} steps/s²", v),
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::UnknownIndex(i) => write!(f, "No pattern at index {}", i),
            PatternError::UnknownName(name) => write!(f, "No pattern named '{}'", name),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<AxisError> for Error {
    fn from(e: AxisError) -> Self {
        Error::Axis(e)
    }
}

impl From<PatternError> for Error {
    fn from(e: PatternError) -> Self {
        Error::Pattern(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for AxisError {}

#[cfg(feature = "std")]
impl std::error::Error for PatternError {}

/// Build a bounded message, truncating on a char boundary if it does not fit.
pub(crate) fn bounded<const N: usize>(msg: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
