//! Animation routines.
//!
//! A routine drives the shared motor in bounded units of work
//! ([`Routine::execute`]) and is repeated by [`Routine::run`] until the motor
//! interrupt is raised.

mod fluctuation;
pub mod morse;
mod registry;
mod year;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::error::Result;
use crate::gpio::GpioDriver;
use crate::motor::MotorController;

pub use fluctuation::{Fluctuation, FluctuationRoutine};
pub use morse::{MorseElement, MorseRoutine};
pub use registry::{build_routines, RoutineKind};
pub use year::{year_fraction, utc_midnight, YearRoutine, SETTLE_TIME};

/// Minimum time between the starts of two executions.
pub const RUN_FLOOR: Duration = Duration::from_millis(500);

/// One of the animation routines.
pub enum Routine<D: GpioDriver> {
    /// Spells a message in Morse code.
    Morse(MorseRoutine<D>),
    /// Points at the elapsed fraction of the year.
    Year(YearRoutine<D>),
    /// Drifts forward with fluctuating timing.
    Fluctuation(FluctuationRoutine<D>),
}

impl<D: GpioDriver> Routine<D> {
    /// Registry kind of this routine.
    pub fn kind(&self) -> RoutineKind {
        match self {
            Routine::Morse(_) => RoutineKind::Morse,
            Routine::Year(_) => RoutineKind::Year,
            Routine::Fluctuation(_) => RoutineKind::Fluctuation,
        }
    }

    /// Configured name of this routine.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Motor this routine drives.
    pub fn motor(&self) -> &Arc<MotorController<D>> {
        match self {
            Routine::Morse(r) => r.motor(),
            Routine::Year(r) => r.motor(),
            Routine::Fluctuation(r) => r.motor(),
        }
    }

    /// Perform one bounded unit of work, returning early when interrupted.
    pub fn execute(&mut self) -> Result<()> {
        match self {
            Routine::Morse(r) => r.execute(),
            Routine::Year(r) => r.execute(),
            Routine::Fluctuation(r) => r.execute(),
        }
    }

    /// Clear the interrupt, then execute repeatedly until it is raised.
    ///
    /// # Errors
    ///
    /// Returns the first motor error; the loop does not retry.
    pub fn run(&mut self) -> Result<()> {
        self.motor().reset_interrupt();
        self.run_until_interrupted()
    }

    /// Like [`run`](Routine::run) but honours an interrupt that is already
    /// raised.
    pub(crate) fn run_until_interrupted(&mut self) -> Result<()> {
        let name = self.name();
        info!(routine = name, "routine started");

        while !self.motor().is_interrupted() {
            let started = Instant::now();
            self.execute()?;

            let elapsed = started.elapsed();
            if elapsed < RUN_FLOOR {
                self.motor().wait(RUN_FLOOR - elapsed);
            }
        }

        info!(routine = name, "routine stopped");
        Ok(())
    }
}

impl<D: GpioDriver> core::fmt::Debug for Routine<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Routine").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::gpio::SimulatedGpio;
    use crate::motor::MotorControllerBuilder;
    use std::thread;

    fn motor() -> Arc<MotorController<SimulatedGpio>> {
        Arc::new(
            MotorControllerBuilder::new()
                .pulse_unit(Duration::ZERO)
                .build(SimulatedGpio::new())
                .unwrap(),
        )
    }

    #[test]
    fn test_build_default_routines() {
        let settings = ConfigStore::defaults().unwrap().settings().unwrap();
        let routines = build_routines(&motor(), &settings).unwrap();

        let names: Vec<_> = routines.iter().map(Routine::name).collect();
        assert_eq!(names, vec!["MorseLogic", "YearLogic", "FlucLogic"]);
    }

    #[test]
    fn test_run_returns_when_interrupted() {
        let motor = motor();
        let mut routine = Routine::Year(
            YearRoutine::new(Arc::clone(&motor), 1.0, 0.0)
                .unwrap()
                .with_reference(utc_midnight(2018, 6, 2))
                .with_settle(Duration::from_secs(60)),
        );

        let remote = Arc::clone(&motor);
        let interrupter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.raise_interrupt();
        });

        let started = Instant::now();
        routine.run().unwrap();
        interrupter.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        // 152 of 365 days: 1600 * 152 / 365 = 666.3
        assert_eq!(motor.position(), 666);
    }

    #[test]
    fn test_run_clears_stale_interrupt() {
        let motor = motor();
        motor.raise_interrupt();

        let mut routine = Routine::Morse(MorseRoutine::new(Arc::clone(&motor), "e", 1.0, 4).unwrap());

        let remote = Arc::clone(&motor);
        let interrupter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.raise_interrupt();
        });
        routine.run().unwrap();
        interrupter.join().unwrap();

        // At least one "e" was spelled before the second interrupt.
        assert!(motor.position() >= 4);
        assert_eq!(motor.position() % 4, 0);
    }

    #[test]
    fn test_run_keeps_floor_between_executions() {
        let mut gpio = SimulatedGpio::new();
        let step = gpio.monitor(13);
        let motor = Arc::new(
            MotorControllerBuilder::new()
                .pulse_unit(Duration::ZERO)
                .build(gpio)
                .unwrap(),
        );
        let mut routine = Routine::Morse(MorseRoutine::new(Arc::clone(&motor), "e", 1.0, 4).unwrap());

        let remote = Arc::clone(&motor);
        let interrupter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(1200));
            remote.raise_interrupt();
        });
        routine.run().unwrap();
        interrupter.join().unwrap();

        // Executions start at 0, 0.5 and 1.0 s: three "e"s of 4 pulses each.
        let edges = step.rising_edges();
        assert!((8..=12).contains(&edges), "{} pulses", edges);
    }

    #[test]
    fn test_run_until_interrupted_honours_raised_flag() {
        let motor = motor();
        motor.raise_interrupt();

        let mut routine = Routine::Morse(MorseRoutine::new(Arc::clone(&motor), "e", 1.0, 4).unwrap());
        routine.run_until_interrupted().unwrap();

        assert_eq!(motor.position(), 0);
    }
}
