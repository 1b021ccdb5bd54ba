//! Error types for asterisk-mirror.
//!
//! Provides unified error handling across configuration, GPIO hardware, motor
//! control and routine orchestration. An interrupted rotation is not an error:
//! it is reported through the returned step count.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all asterisk-mirror operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// GPIO device error at construction
    Hardware(HardwareError),
    /// Motor operation error
    Motor(MotorError),
    /// Motion parameter error
    Motion(MotionError),
    /// Worker/timer thread management error
    Orchestrator(OrchestratorError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// File I/O error
    IoError(heapless::String<128>),
    /// Required key is absent
    MissingKey(heapless::String<64>),
    /// Value present but not convertible to the requested type
    InvalidValue {
        /// Dotted path of the key
        key: heapless::String<64>,
        /// Name of the expected type
        expected: &'static str,
    },
    /// Message contains a character with no Morse code
    UnmappedCharacter(char),
    /// Routine name not present in the registry
    UnknownRoutine(heapless::String<32>),
    /// Routine list is empty
    NoRoutines,
    /// Speed multiplier must be finite and > 0
    InvalidSpeed {
        /// Dotted path of the key
        key: &'static str,
        /// Offending value
        value: f64,
    },
    /// Fluctuation rate must be within [0, 1]
    InvalidRate(f64),
    /// Transition interval must be > 0 seconds
    InvalidTransition(u64),
    /// Pulse unit must be finite and > 0 seconds
    InvalidPulseUnit(f64),
    /// Dot step count must be > 0
    InvalidDotSteps(u32),
    /// Steps per revolution must be >= 2
    InvalidStepsPerRevolution(u32),
    /// The same GPIO pin is assigned to two lines
    DuplicatePin(u8),
}

/// GPIO device errors raised while configuring output lines.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// Pin number does not exist on the device
    PinUnavailable(u8),
    /// Pin already configured by another line
    PinConflict(u8),
}

/// Motor operation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotorError {
    /// Pin operation failed
    PinError,
}

/// Motion parameter errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Speed multiplier is not finite and positive
    InvalidSpeed(f64),
    /// Angle is not finite or its step target is out of range
    InvalidAngle(f64),
}

/// Orchestrator errors.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    /// Spawning a worker or timer thread failed
    Spawn(heapless::String<64>),
    /// Routines were lost because the worker thread panicked
    RoutinesLost,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Hardware(e) => write!(f, "Hardware error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
            Error::Motion(e) => write!(f, "Motion error: {}", e),
            Error::Orchestrator(e) => write!(f, "Orchestrator error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::MissingKey(key) => write!(f, "Missing key '{}'", key),
            ConfigError::InvalidValue { key, expected } => {
                write!(f, "Invalid value for '{}': expected {}", key, expected)
            }
            ConfigError::UnmappedCharacter(c) => {
                write!(f, "Character {:?} has no Morse code", c)
            }
            ConfigError::UnknownRoutine(name) => write!(f, "Unknown routine '{}'", name),
            ConfigError::NoRoutines => write!(f, "No routines configured"),
            ConfigError::InvalidSpeed { key, value } => {
                write!(f, "Invalid speed for '{}': {}. Must be > 0", key, value)
            }
            ConfigError::InvalidRate(v) => write!(f, "Invalid fluctuation rate: {}. Must be 0-1", v),
            ConfigError::InvalidTransition(v) => {
                write!(f, "Invalid transition interval: {}s. Must be > 0", v)
            }
            ConfigError::InvalidPulseUnit(v) => write!(f, "Invalid pulse unit: {}s. Must be > 0", v),
            ConfigError::InvalidDotSteps(v) => write!(f, "Invalid Morse dot steps: {}. Must be > 0", v),
            ConfigError::InvalidStepsPerRevolution(v) => {
                write!(f, "Invalid steps per revolution: {}. Must be >= 2", v)
            }
            ConfigError::DuplicatePin(pin) => write!(f, "GPIO pin {} assigned twice", pin),
        }
    }
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareError::PinUnavailable(pin) => write!(f, "GPIO pin {} is not available", pin),
            HardwareError::PinConflict(pin) => write!(f, "GPIO pin {} is already in use", pin),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
        }
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::InvalidSpeed(v) => write!(f, "Invalid speed {}. Must be > 0", v),
            MotionError::InvalidAngle(v) => write!(f, "Invalid angle {} half-turns", v),
        }
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::Spawn(msg) => write!(f, "Failed to spawn thread: {}", msg),
            OrchestratorError::RoutinesLost => {
                write!(f, "Routines lost after worker thread panic")
            }
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Error::Hardware(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Error::Motion(e)
    }
}

impl From<OrchestratorError> for Error {
    fn from(e: OrchestratorError) -> Self {
        Error::Orchestrator(e)
    }
}

impl std::error::Error for Error {}

impl std::error::Error for ConfigError {}

impl std::error::Error for HardwareError {}

impl std::error::Error for MotorError {}

impl std::error::Error for MotionError {}

impl std::error::Error for OrchestratorError {}

/// Copy `s` into a fixed-capacity string, dropping whatever does not fit.
pub(crate) fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
