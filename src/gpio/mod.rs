//! GPIO module for asterisk-mirror.
//!
//! The motor needs three digital output lines (STEP, DIR, ENABLE). A
//! [`GpioDriver`] hands them out as embedded-hal 1.0 [`OutputPin`]s and is
//! cleaned up when the motor controller is dropped.

mod simulated;

use embedded_hal::digital::OutputPin;

use crate::error::{ConfigError, Result};

pub use simulated::{PinMonitor, SimulatedGpio, SimulatedPin, MAX_PIN};

/// A digital output device that can hand out output lines by pin number.
pub trait GpioDriver: Send {
    /// Output line type produced by this driver.
    type Pin: OutputPin + Send;

    /// Configure `pin` as an output and return its line.
    ///
    /// # Errors
    ///
    /// Returns a [`HardwareError`](crate::error::HardwareError) when the pin
    /// does not exist or is already in use.
    fn configure_output(&mut self, pin: u8) -> Result<Self::Pin>;

    /// Release every line configured through this driver.
    fn cleanup(&mut self);
}

/// GPIO pin numbers for the three motor lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    /// STEP line (one pulse per microstep).
    pub step: u8,
    /// DIR line (high = backward).
    pub direction: u8,
    /// ENABLE line (active low).
    pub enable: u8,
}

impl PinAssignment {
    /// Create a new pin assignment.
    pub const fn new(step: u8, direction: u8, enable: u8) -> Self {
        Self {
            step,
            direction,
            enable,
        }
    }

    /// Check that no pin is assigned to two lines.
    pub fn validate(&self) -> Result<()> {
        if self.step == self.direction || self.step == self.enable {
            return Err(ConfigError::DuplicatePin(self.step).into());
        }
        if self.direction == self.enable {
            return Err(ConfigError::DuplicatePin(self.direction).into());
        }
        Ok(())
    }
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self::new(13, 19, 9)
    }
}
