//! Builder pattern for MotorController.

use std::time::Duration;

use crate::config::Settings;
use crate::error::{ConfigError, Result};
use crate::gpio::{GpioDriver, PinAssignment};

use super::controller::MotorController;
use super::position::DEFAULT_STEPS_PER_REVOLUTION;

/// Default pulse unit: one millisecond per step at speed 1.0.
pub const DEFAULT_PULSE_UNIT: Duration = Duration::from_millis(1);

/// Builder for creating MotorController instances.
#[derive(Debug, Clone)]
pub struct MotorControllerBuilder {
    pins: PinAssignment,
    pulse_unit: Duration,
    steps_per_revolution: u32,
}

impl Default for MotorControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorControllerBuilder {
    /// Create a new builder with default pins (13, 19, 9), a 1 ms pulse unit
    /// and 1600 steps per revolution.
    pub fn new() -> Self {
        Self {
            pins: PinAssignment::default(),
            pulse_unit: DEFAULT_PULSE_UNIT,
            steps_per_revolution: DEFAULT_STEPS_PER_REVOLUTION,
        }
    }

    /// Set the STEP, DIR and ENABLE pin numbers.
    pub fn pins(mut self, pins: PinAssignment) -> Self {
        self.pins = pins;
        self
    }

    /// Set the time of one step at speed 1.0.
    pub fn pulse_unit(mut self, pulse_unit: Duration) -> Self {
        self.pulse_unit = pulse_unit;
        self
    }

    /// Set the number of microsteps in one revolution.
    pub fn steps_per_revolution(mut self, steps: u32) -> Self {
        self.steps_per_revolution = steps;
        self
    }

    /// Configure from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured pulse unit is not a valid duration.
    pub fn from_settings(mut self, settings: &Settings) -> Result<Self> {
        let system = &settings.system;
        self.pins = system.pins();
        self.pulse_unit = Duration::try_from_secs_f64(system.pulse_unit)
            .map_err(|_| ConfigError::InvalidPulseUnit(system.pulse_unit))?;
        self.steps_per_revolution = system.steps_per_revolution;
        Ok(self)
    }

    /// Build the MotorController on top of `driver`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pins clash, the revolution is too small, or the
    /// driver cannot configure a line.
    pub fn build<D: GpioDriver>(self, driver: D) -> Result<MotorController<D>> {
        if self.steps_per_revolution < 2 {
            return Err(ConfigError::InvalidStepsPerRevolution(self.steps_per_revolution).into());
        }

        MotorController::new(driver, self.pins, self.pulse_unit, self.steps_per_revolution)
    }
}
