//! Fluctuation routine: a slow forward drift with 1/f-like timing jitter.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::config::FluctuationSettings;
use crate::error::Result;
use crate::gpio::GpioDriver;
use crate::motor::{Direction, MotorController};

/// Distance from 0 or 1 at which the state is re-seeded.
const STICK_MARGIN: f64 = 0.001;

/// Intermittency-map state in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fluctuation {
    value: f64,
}

impl Fluctuation {
    /// Start from `seed`, clamped into `[0, 1]`.
    pub fn new(seed: f64) -> Self {
        let value = if seed.is_finite() {
            seed.clamp(0.0, 1.0)
        } else {
            0.5
        };
        Self { value }
    }

    /// Start from a clock-derived seed in `[0.1, 0.9)`.
    pub fn seeded() -> Self {
        Self::new(clock_seed())
    }

    /// Current state.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Advance one step and return the new state.
    pub fn step(&mut self) -> f64 {
        let x = self.value;
        let next = if x < 0.5 {
            x + 2.0 * x * x
        } else {
            x - 2.0 * (1.0 - x) * (1.0 - x)
        };

        self.value = if next < STICK_MARGIN || next > 1.0 - STICK_MARGIN {
            clock_seed()
        } else {
            next
        };
        self.value
    }
}

fn clock_seed() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    0.1 + 0.8 * f64::from(nanos % 1_000_000) / 1_000_000.0
}

/// Steps forward continuously, modulating the step interval.
pub struct FluctuationRoutine<D: GpioDriver> {
    motor: Arc<MotorController<D>>,
    speed: f64,
    fluctuate: bool,
    rate: f64,
    state: Fluctuation,
}

impl<D: GpioDriver> FluctuationRoutine<D> {
    /// Create a drift routine.
    ///
    /// # Errors
    ///
    /// Returns an error if `speed` is not positive.
    pub fn new(motor: Arc<MotorController<D>>, speed: f64, fluctuate: bool, rate: f64) -> Result<Self> {
        motor.step_interval(speed)?;
        Ok(Self {
            motor,
            speed,
            fluctuate,
            rate: rate.clamp(0.0, 1.0),
            state: Fluctuation::seeded(),
        })
    }

    /// Create from the `[FlucLogic]` section.
    ///
    /// # Errors
    ///
    /// See [`FluctuationRoutine::new`].
    pub fn from_settings(
        motor: Arc<MotorController<D>>,
        settings: &FluctuationSettings,
    ) -> Result<Self> {
        Self::new(motor, settings.speed, settings.fluctuate, settings.rate)
    }

    /// Replace the fluctuation state.
    pub fn with_state(mut self, state: Fluctuation) -> Self {
        self.state = state;
        self
    }

    /// Current fluctuation state.
    pub fn state(&self) -> Fluctuation {
        self.state
    }

    pub(crate) fn motor(&self) -> &Arc<MotorController<D>> {
        &self.motor
    }

    /// Interval for the next step given the unmodulated one.
    pub fn next_interval(&mut self, base: Duration) -> Duration {
        if !self.fluctuate {
            return base;
        }
        let fluc = self.state.step();
        base.mul_f64(1.0 - self.rate + fluc * self.rate)
    }

    /// Drift forward until interrupted. The motor is disabled on exit.
    pub fn execute(&mut self) -> Result<()> {
        let base = self.motor.step_interval(self.speed)?;
        info!(fluctuate = self.fluctuate, rate = self.rate, "drifting");

        self.motor.enable(true)?;
        let drifted = self.drift(base);
        let disabled = self.motor.disable();

        let steps = drifted?;
        disabled?;
        debug!(steps, "drift stopped");
        Ok(())
    }

    fn drift(&mut self, base: Duration) -> Result<u64> {
        let mut steps = 0;
        while !self.motor.is_interrupted() {
            let started = Instant::now();
            self.motor.pulse_once(Direction::Forward)?;
            steps += 1;

            let interval = self.next_interval(base);
            if self.motor.wait(interval.saturating_sub(started.elapsed())) {
                break;
            }
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::SimulatedGpio;
    use crate::motor::MotorControllerBuilder;
    use std::thread;

    #[test]
    fn test_recurrence() {
        let mut fluc = Fluctuation::new(0.3);
        assert!((fluc.step() - 0.48).abs() < 1e-12);

        let mut fluc = Fluctuation::new(0.75);
        assert!((fluc.step() - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_points_are_reseeded() {
        for seed in [0.0, 1.0, 0.0005, 0.9995] {
            let mut fluc = Fluctuation::new(seed);
            let next = fluc.step();
            assert!((0.1..0.9).contains(&next), "seed {} gave {}", seed, next);
        }
    }

    #[test]
    fn test_state_stays_in_range() {
        let mut fluc = Fluctuation::new(0.123);
        for _ in 0..10_000 {
            let v = fluc.step();
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_interval_without_fluctuation() {
        let motor = MotorControllerBuilder::new()
            .build(SimulatedGpio::new())
            .unwrap();
        let mut routine = FluctuationRoutine::new(Arc::new(motor), 1.0, false, 0.5).unwrap();
        let base = Duration::from_millis(10);
        assert_eq!(routine.next_interval(base), base);
    }

    #[test]
    fn test_interval_with_fluctuation() {
        let motor = MotorControllerBuilder::new()
            .build(SimulatedGpio::new())
            .unwrap();
        let mut routine = FluctuationRoutine::new(Arc::new(motor), 1.0, true, 0.5)
            .unwrap()
            .with_state(Fluctuation::new(0.3));

        // 0.3 -> 0.48, so 1 - 0.5 + 0.48 * 0.5 = 0.74
        let interval = routine.next_interval(Duration::from_millis(100));
        assert!((interval.as_secs_f64() - 0.074).abs() < 1e-6);
    }

    #[test]
    fn test_execute_drifts_until_interrupted() {
        let mut gpio = SimulatedGpio::new();
        let step = gpio.monitor(13);
        let enable = gpio.monitor(9);
        let motor = MotorControllerBuilder::new()
            .pulse_unit(Duration::from_micros(100))
            .build(gpio)
            .unwrap();
        let motor = Arc::new(motor);
        let mut routine = FluctuationRoutine::new(Arc::clone(&motor), 1.0, true, 0.5).unwrap();

        let remote = Arc::clone(&motor);
        let interrupter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.raise_interrupt();
        });
        routine.execute().unwrap();
        interrupter.join().unwrap();

        let edges = step.rising_edges();
        assert!(edges > 0);
        assert_eq!(u64::from(motor.position()), edges % 1600);
        assert!(enable.is_high());
    }
}
