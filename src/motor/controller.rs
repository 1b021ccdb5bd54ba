//! Stepper motor controller.
//!
//! Issues individually timed pulses on embedded-hal 1.0 output lines and makes
//! every rotation cooperatively interruptible without losing position.

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{MotionError, MotorError, Result};
use crate::gpio::{GpioDriver, PinAssignment};

use super::direction::Direction;
use super::position::Position;
use super::signal::Signal;

/// Output lines and the driver that owns them.
struct Hardware<D: GpioDriver> {
    driver: D,
    /// STEP pin (pulse to move one step).
    step_pin: D::Pin,
    /// DIR pin (high = backward).
    dir_pin: D::Pin,
    /// ENABLE pin (low = driver current on).
    enable_pin: D::Pin,
}

impl<D: GpioDriver> Hardware<D> {
    fn set_enabled(&mut self, on: bool) -> Result<()> {
        if on {
            self.enable_pin.set_low().map_err(|_| MotorError::PinError)?;
        } else {
            self.enable_pin.set_high().map_err(|_| MotorError::PinError)?;
        }
        Ok(())
    }
}

/// Single stepper motor with modular position tracking.
///
/// Shared between the worker thread (which steps it) and any thread that
/// needs to raise the interrupt. All methods take `&self`.
pub struct MotorController<D: GpioDriver> {
    hardware: Mutex<Hardware<D>>,

    /// Current rotor position.
    position: Position,

    /// Time of one step at speed 1.0.
    pulse_unit: Duration,

    /// Cooperative cancellation for rotations and waits.
    interrupt: Signal,
}

impl<D: GpioDriver> MotorController<D> {
    /// Configure the three output lines on `driver` and leave the motor disabled.
    ///
    /// # Errors
    ///
    /// Fails if the assignment reuses a pin or the driver cannot provide a line.
    pub(crate) fn new(
        mut driver: D,
        pins: PinAssignment,
        pulse_unit: Duration,
        steps_per_revolution: u32,
    ) -> Result<Self> {
        pins.validate()?;

        let step_pin = driver.configure_output(pins.step)?;
        let dir_pin = driver.configure_output(pins.direction)?;
        let enable_pin = driver.configure_output(pins.enable)?;

        let mut hardware = Hardware {
            driver,
            step_pin,
            dir_pin,
            enable_pin,
        };
        hardware.set_enabled(false)?;

        debug!(
            step_pin = pins.step,
            dir_pin = pins.direction,
            enable_pin = pins.enable,
            steps_per_revolution,
            "motor controller ready"
        );

        Ok(Self {
            hardware: Mutex::new(hardware),
            position: Position::new(steps_per_revolution),
            pulse_unit,
            interrupt: Signal::new(),
        })
    }

    /// Get current position in steps, in `[0, steps_per_revolution)`.
    #[inline]
    pub fn position(&self) -> u32 {
        self.position.steps()
    }

    /// Get the size of one revolution in steps.
    #[inline]
    pub fn steps_per_revolution(&self) -> u32 {
        self.position.steps_per_revolution()
    }

    /// Get the time of one step at speed 1.0.
    #[inline]
    pub fn pulse_unit(&self) -> Duration {
        self.pulse_unit
    }

    /// Get the interrupt signal shared with other threads.
    #[inline]
    pub fn interrupt(&self) -> &Signal {
        &self.interrupt
    }

    /// Lower the interrupt before starting fresh work.
    pub fn reset_interrupt(&self) {
        self.interrupt.reset();
    }

    /// Ask the running operation to stop at its next pulse or wait boundary.
    pub fn raise_interrupt(&self) {
        debug!("interrupt raised");
        self.interrupt.raise();
    }

    /// Check whether the interrupt is raised.
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_raised()
    }

    /// Sleep for `duration` or until interrupted.
    ///
    /// Returns `true` if interrupted. This is the only place the motor blocks.
    pub fn wait(&self, duration: Duration) -> bool {
        self.interrupt.wait_timeout(duration)
    }

    /// Switch the driver current on or off.
    pub fn enable(&self, on: bool) -> Result<()> {
        self.hardware.lock().set_enabled(on)
    }

    /// Switch the driver current off.
    pub fn disable(&self) -> Result<()> {
        self.enable(false)
    }

    /// Time between pulses at `speed`.
    pub fn step_interval(&self, speed: f64) -> Result<Duration> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(MotionError::InvalidSpeed(speed).into());
        }
        Duration::try_from_secs_f64(self.pulse_unit.as_secs_f64() / speed)
            .map_err(|_| MotionError::InvalidSpeed(speed).into())
    }

    /// Issue exactly one step pulse.
    ///
    /// The hardware lock is held for the whole pulse so the position update
    /// cannot be separated from the edge that caused it.
    pub fn pulse_once(&self, direction: Direction) -> Result<()> {
        let mut hw = self.hardware.lock();

        if direction.pin_level() {
            hw.dir_pin.set_high().map_err(|_| MotorError::PinError)?;
        } else {
            hw.dir_pin.set_low().map_err(|_| MotorError::PinError)?;
        }

        hw.step_pin.set_high().map_err(|_| MotorError::PinError)?;
        // The driver steps on the rising edge: count it now.
        let position = self.position.advance(direction.sign());
        hw.step_pin.set_low().map_err(|_| MotorError::PinError)?;

        trace!(position, "pulse");
        Ok(())
    }

    /// Rotate by a signed number of steps.
    ///
    /// Returns the signed number of pulses actually issued, which is smaller
    /// in magnitude than `count` when the interrupt was raised mid-rotation.
    /// The motor is disabled on exit.
    pub fn rotate_by_steps(&self, count: i64, speed: f64) -> Result<i64> {
        if count == 0 {
            return Ok(0);
        }

        let interval = self.step_interval(speed)?;
        let direction = Direction::from_steps(count);

        self.enable(true)?;
        let issued = self.issue_pulses(count.unsigned_abs(), direction, interval);
        let disabled = self.disable();

        let issued = issued? as i64 * direction.sign();
        disabled?;

        if issued != count {
            debug!(requested = count, issued, "rotation interrupted");
        }
        Ok(issued)
    }

    fn issue_pulses(&self, total: u64, direction: Direction, interval: Duration) -> Result<u64> {
        let mut issued = 0;
        while issued < total {
            if self.is_interrupted() {
                break;
            }
            self.pulse_once(direction)?;
            issued += 1;
            if self.wait(interval) {
                break;
            }
        }
        Ok(issued)
    }

    /// Rotate by an angle in half-turns (`1.0` = 180 degrees).
    ///
    /// # Errors
    ///
    /// Returns `InvalidAngle` if `fraction` is not finite or too large.
    pub fn rotate_by_angle(&self, fraction: f64, speed: f64) -> Result<i64> {
        let steps = self.angle_steps(fraction)?;
        self.rotate_by_steps(steps, speed)
    }

    /// Rotate to an absolute angle in half-turns (`1.0` = 180 degrees).
    ///
    /// The target is not wrapped: a negative fraction is reached by rotating
    /// backwards from the current position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAngle` if `fraction` is not finite or too large.
    pub fn rotate_to_angle(&self, fraction: f64, speed: f64) -> Result<i64> {
        let target = self.angle_steps(fraction)?;
        let steps = self.position.steps_to(target);
        self.rotate_by_steps(steps, speed)
    }

    fn angle_steps(&self, fraction: f64) -> Result<i64> {
        self.position
            .half_turns_to_steps(fraction)
            .ok_or_else(|| MotionError::InvalidAngle(fraction).into())
    }

    /// Rotate back to position 0 along the shorter way round.
    pub fn recenter(&self, speed: f64) -> Result<i64> {
        let steps = self.position.steps_to_origin();
        self.rotate_by_steps(steps, speed)
    }
}

impl<D: GpioDriver> Drop for MotorController<D> {
    fn drop(&mut self) {
        self.interrupt.raise();
        let hw = self.hardware.get_mut();
        let _ = hw.set_enabled(false);
        hw.driver.cleanup();
        debug!("motor controller released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::SimulatedGpio;
    use crate::motor::MotorControllerBuilder;
    use std::sync::Arc;
    use std::thread;

    fn controller(pulse_unit: Duration) -> MotorController<SimulatedGpio> {
        MotorControllerBuilder::new()
            .pulse_unit(pulse_unit)
            .build(SimulatedGpio::new())
            .unwrap()
    }

    #[test]
    fn test_rotate_forward_and_back() {
        let motor = controller(Duration::ZERO);

        assert_eq!(motor.rotate_by_steps(100, 10.0).unwrap(), 100);
        assert_eq!(motor.position(), 100);

        assert_eq!(motor.rotate_by_steps(-50, 10.0).unwrap(), -50);
        assert_eq!(motor.position(), 50);
    }

    #[test]
    fn test_zero_steps_is_noop() {
        let mut gpio = SimulatedGpio::new();
        let enable = gpio.monitor(9);
        let motor = MotorControllerBuilder::new().build(gpio).unwrap();

        assert_eq!(motor.rotate_by_steps(0, 1.0).unwrap(), 0);
        assert_eq!(motor.position(), 0);
        // Never pulled low, so the line stayed high (disabled) throughout.
        assert_eq!(enable.rising_edges(), 1);
    }

    #[test]
    fn test_motor_disabled_after_rotation() {
        let mut gpio = SimulatedGpio::new();
        let enable = gpio.monitor(9);
        let motor = MotorControllerBuilder::new()
            .pulse_unit(Duration::ZERO)
            .build(gpio)
            .unwrap();

        motor.rotate_by_steps(10, 1.0).unwrap();
        assert!(enable.is_high());
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let motor = controller(Duration::ZERO);

        for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                motor.rotate_by_steps(10, speed),
                Err(crate::Error::Motion(MotionError::InvalidSpeed(_)))
            ));
        }
        assert_eq!(motor.position(), 0);
    }

    #[test]
    fn test_step_interval_scales_with_speed() {
        let motor = controller(Duration::from_millis(1));
        assert_eq!(motor.step_interval(1.0).unwrap(), Duration::from_millis(1));
        assert_eq!(motor.step_interval(2.0).unwrap(), Duration::from_micros(500));
    }

    #[test]
    fn test_rotate_when_already_interrupted() {
        let motor = controller(Duration::ZERO);
        motor.raise_interrupt();

        assert_eq!(motor.rotate_by_steps(100, 1.0).unwrap(), 0);
        assert_eq!(motor.position(), 0);
    }

    #[test]
    fn test_interrupt_mid_rotation() {
        let motor = Arc::new(controller(Duration::from_micros(200)));
        let remote = Arc::clone(&motor);
        let interrupter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.raise_interrupt();
        });

        let steps = motor.rotate_by_steps(100_000, 1.0).unwrap();
        interrupter.join().unwrap();

        assert!(steps > 0 && steps < 100_000);
        assert_eq!(i64::from(motor.position()), steps % 1600);
    }

    #[test]
    fn test_rotate_to_angle() {
        let motor = controller(Duration::ZERO);

        assert_eq!(motor.rotate_to_angle(1.0, 1.0).unwrap(), 800);
        assert_eq!(motor.position(), 800);

        assert_eq!(motor.rotate_to_angle(0.25, 1.0).unwrap(), -600);
        assert_eq!(motor.position(), 200);

        assert_eq!(motor.rotate_to_angle(-0.5, 1.0).unwrap(), -600);
        assert_eq!(motor.position(), 1200);
    }

    #[test]
    fn test_unusable_angles_rejected() {
        let motor = controller(Duration::ZERO);
        motor.rotate_by_steps(300, 1.0).unwrap();

        for fraction in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300, -1e300] {
            assert!(matches!(
                motor.rotate_to_angle(fraction, 1.0),
                Err(crate::Error::Motion(MotionError::InvalidAngle(_)))
            ));
            assert!(matches!(
                motor.rotate_by_angle(fraction, 1.0),
                Err(crate::Error::Motion(MotionError::InvalidAngle(_)))
            ));
        }
        assert_eq!(motor.position(), 300);
    }

    #[test]
    fn test_rotate_by_angle() {
        let motor = controller(Duration::ZERO);

        assert_eq!(motor.rotate_by_angle(1.0, 1.0).unwrap(), 800);
        assert_eq!(motor.position(), 800);

        assert_eq!(motor.rotate_by_angle(-1.5, 1.0).unwrap(), -1200);
        assert_eq!(motor.position(), 1200);
    }

    #[test]
    fn test_recenter() {
        let motor = controller(Duration::ZERO);

        motor.rotate_by_steps(10, 1.0).unwrap();
        assert_eq!(motor.recenter(1.0).unwrap(), -10);
        assert_eq!(motor.position(), 0);

        motor.rotate_by_steps(1200, 1.0).unwrap();
        assert_eq!(motor.recenter(1.0).unwrap(), 400);
        assert_eq!(motor.position(), 0);

        motor.rotate_by_steps(-400, 1.0).unwrap();
        assert_eq!(motor.position(), 1200);
        assert_eq!(motor.recenter(1.0).unwrap(), 400);
        assert_eq!(motor.position(), 0);
    }

    #[test]
    fn test_drop_disables_and_cleans_up() {
        let mut gpio = SimulatedGpio::new();
        let step = gpio.monitor(13);
        let motor = MotorControllerBuilder::new()
            .pulse_unit(Duration::ZERO)
            .build(gpio)
            .unwrap();

        motor.rotate_by_steps(3, 1.0).unwrap();
        drop(motor);

        assert_eq!(step.rising_edges(), 3);
        assert!(!step.is_high());
    }
}
