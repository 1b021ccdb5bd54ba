//! Host-side GPIO driver.
//!
//! Lets the motor engine run on machines without a GPIO header. Each line
//! keeps its level and counts rising edges, which is how tests check the
//! number of pulses actually driven onto the STEP line.

use core::convert::Infallible;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use embedded_hal::digital::{ErrorType, OutputPin};
use tracing::{debug, trace};

use crate::error::{HardwareError, Result};

use super::GpioDriver;

/// Highest BCM pin number on a 40-pin header.
pub const MAX_PIN: u8 = 27;

/// Shared view of a simulated line.
#[derive(Debug, Clone, Default)]
pub struct PinMonitor {
    level: Arc<AtomicBool>,
    rising_edges: Arc<AtomicU64>,
}

impl PinMonitor {
    /// Current output level (`true` = high).
    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    /// Number of low-to-high transitions since the line was created.
    pub fn rising_edges(&self) -> u64 {
        self.rising_edges.load(Ordering::SeqCst)
    }
}

/// Output line handed out by [`SimulatedGpio`].
#[derive(Debug)]
pub struct SimulatedPin {
    number: u8,
    monitor: PinMonitor,
}

impl SimulatedPin {
    /// Pin number of this line.
    pub fn number(&self) -> u8 {
        self.number
    }
}

impl ErrorType for SimulatedPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedPin {
    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        if !self.monitor.level.swap(true, Ordering::SeqCst) {
            self.monitor.rising_edges.fetch_add(1, Ordering::SeqCst);
        }
        trace!(pin = self.number, "high");
        Ok(())
    }

    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.monitor.level.store(false, Ordering::SeqCst);
        trace!(pin = self.number, "low");
        Ok(())
    }
}

/// Simulated digital output device with BCM pins `0..=MAX_PIN`.
#[derive(Debug, Default)]
pub struct SimulatedGpio {
    monitors: HashMap<u8, PinMonitor>,
    configured: Vec<u8>,
}

impl SimulatedGpio {
    /// Create a device with no configured lines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the monitor for `pin`, creating it if needed.
    ///
    /// Monitors can be taken before the line is configured, so a test can keep
    /// watching a pin after the driver has been moved into a controller.
    pub fn monitor(&mut self, pin: u8) -> PinMonitor {
        self.monitors.entry(pin).or_default().clone()
    }

    /// Pins currently configured as outputs.
    pub fn configured_pins(&self) -> &[u8] {
        &self.configured
    }
}

impl GpioDriver for SimulatedGpio {
    type Pin = SimulatedPin;

    fn configure_output(&mut self, pin: u8) -> Result<SimulatedPin> {
        if pin > MAX_PIN {
            return Err(HardwareError::PinUnavailable(pin).into());
        }
        if self.configured.contains(&pin) {
            return Err(HardwareError::PinConflict(pin).into());
        }
        self.configured.push(pin);
        debug!(pin, "configured simulated output");
        Ok(SimulatedPin {
            number: pin,
            monitor: self.monitor(pin),
        })
    }

    fn cleanup(&mut self) {
        for pin in self.configured.drain(..) {
            if let Some(monitor) = self.monitors.get(&pin) {
                monitor.level.store(false, Ordering::SeqCst);
            }
        }
        debug!("simulated GPIO cleaned up");
    }
}
