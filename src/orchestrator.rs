//! Routine orchestration.
//!
//! A timer thread advances the active routine index once per transition
//! interval and raises the motor interrupt; a worker thread runs whichever
//! routine is active until it is interrupted.

use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::Settings;
use crate::error::{truncated, ConfigError, Error, OrchestratorError, Result};
use crate::gpio::GpioDriver;
use crate::motor::{MotorController, Signal};
use crate::routine::{build_routines, Routine};

/// Worker poll interval while no routine is active.
pub const IDLE_POLL: Duration = Duration::from_millis(100);

/// Cycles through routines on a shared motor.
pub struct Orchestrator<D: GpioDriver + 'static> {
    motor: Arc<MotorController<D>>,
    names: Vec<&'static str>,
    /// Held here while stopped; owned by the worker while running.
    routines: Option<Vec<Routine<D>>>,
    transition: Duration,
    active: Arc<AtomicIsize>,
    stop: Signal,
    worker: Option<JoinHandle<Vec<Routine<D>>>>,
    timer: Option<JoinHandle<()>>,
}

impl<D: GpioDriver + 'static> Orchestrator<D> {
    /// Build the routines listed in `System.logics` on `motor`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a routine cannot be built.
    pub fn new(settings: &Settings, motor: Arc<MotorController<D>>) -> Result<Self> {
        let routines = build_routines(&motor, settings)?;
        let transition = Duration::from_secs(settings.system.transition);
        Self::with_routines(motor, routines, transition)
    }

    /// Orchestrate already-built routines.
    ///
    /// # Errors
    ///
    /// Returns `NoRoutines` for an empty list and `InvalidTransition` for a
    /// zero interval.
    pub fn with_routines(
        motor: Arc<MotorController<D>>,
        routines: Vec<Routine<D>>,
        transition: Duration,
    ) -> Result<Self> {
        if routines.is_empty() {
            return Err(Error::Config(ConfigError::NoRoutines));
        }
        if transition.is_zero() {
            return Err(Error::Config(ConfigError::InvalidTransition(0)));
        }

        let names = routines.iter().map(Routine::name).collect();

        Ok(Self {
            motor,
            names,
            routines: Some(routines),
            transition,
            active: Arc::new(AtomicIsize::new(-1)),
            stop: Signal::new(),
            worker: None,
            timer: None,
        })
    }

    /// Check whether the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Index of the active routine, or `-1` before the first switch.
    pub fn active_index(&self) -> isize {
        self.active.load(Ordering::SeqCst)
    }

    /// Name of the active routine.
    pub fn active_routine(&self) -> Option<&'static str> {
        usize::try_from(self.active_index())
            .ok()
            .and_then(|index| self.names.get(index).copied())
    }

    /// Routine names in cycling order.
    pub fn routine_names(&self) -> &[&'static str] {
        &self.names
    }

    /// Time between routine switches.
    pub fn transition_interval(&self) -> Duration {
        self.transition
    }

    /// The shared motor.
    pub fn motor(&self) -> &Arc<MotorController<D>> {
        &self.motor
    }

    /// Start the worker and timer threads. Does nothing if already running.
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be spawned or the routines were
    /// lost to an earlier worker panic.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        // Reap a worker that ended on its own.
        self.stop();

        let routines = self
            .routines
            .take()
            .ok_or(Error::Orchestrator(OrchestratorError::RoutinesLost))?;

        self.stop.reset();
        self.active.store(-1, Ordering::SeqCst);

        self.worker = Some(self.spawn_worker(routines)?);

        match self.spawn_timer() {
            Ok(timer) => self.timer = Some(timer),
            Err(e) => {
                self.stop();
                return Err(e);
            }
        }

        info!(
            routines = ?self.names,
            transition_secs = self.transition.as_secs_f64(),
            "orchestrator started"
        );
        Ok(())
    }

    /// Stop both threads and wait for them. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.worker.is_none() && self.timer.is_none() {
            return;
        }

        self.stop.raise();
        self.motor.raise_interrupt();

        if let Some(timer) = self.timer.take() {
            if timer.join().is_err() {
                error!("timer thread panicked");
            }
        }

        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(routines) => self.routines = Some(routines),
                Err(_) => error!("worker thread panicked, routines lost"),
            }
        }

        self.active.store(-1, Ordering::SeqCst);
        info!("orchestrator stopped");
    }

    fn spawn_worker(&self, mut routines: Vec<Routine<D>>) -> Result<JoinHandle<Vec<Routine<D>>>> {
        let motor = Arc::clone(&self.motor);
        let active = Arc::clone(&self.active);
        let stop = self.stop.clone();

        spawn("asterisk-worker", move || {
            loop {
                // Clear before reading the index: a switch landing in between
                // leaves the interrupt raised and is picked up next pass.
                motor.reset_interrupt();
                if stop.is_raised() {
                    break;
                }

                let routine = usize::try_from(active.load(Ordering::SeqCst))
                    .ok()
                    .and_then(|index| routines.get_mut(index));
                let Some(routine) = routine else {
                    stop.wait_timeout(IDLE_POLL);
                    continue;
                };

                if let Err(e) = routine.run_until_interrupted() {
                    error!(routine = routine.name(), error = %e, "routine failed, stopping");
                    stop.raise();
                    break;
                }
            }
            debug!("worker thread exiting");
            routines
        })
    }

    fn spawn_timer(&self) -> Result<JoinHandle<()>> {
        let motor = Arc::clone(&self.motor);
        let active = Arc::clone(&self.active);
        let stop = self.stop.clone();
        let names = self.names.clone();
        let transition = self.transition;

        spawn("asterisk-timer", move || loop {
            let len = names.len() as isize;
            let next = (active.load(Ordering::SeqCst) + 1).rem_euclid(len);
            active.store(next, Ordering::SeqCst);
            info!(routine = names[next as usize], index = next, "switching routine");
            motor.raise_interrupt();

            if stop.wait_timeout(transition) {
                debug!("timer thread exiting");
                break;
            }
        })
    }
}

impl<D: GpioDriver + 'static> Drop for Orchestrator<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn<T, F>(name: &str, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e| Error::Orchestrator(OrchestratorError::Spawn(truncated(&e.to_string()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::gpio::SimulatedGpio;
    use crate::motor::MotorControllerBuilder;
    use crate::routine::MorseRoutine;
    use std::time::Instant;

    fn motor() -> Arc<MotorController<SimulatedGpio>> {
        Arc::new(
            MotorControllerBuilder::new()
                .pulse_unit(Duration::from_micros(50))
                .build(SimulatedGpio::new())
                .unwrap(),
        )
    }

    fn orchestrator(transition: Duration) -> Orchestrator<SimulatedGpio> {
        let motor = motor();
        let routines = vec![
            Routine::Morse(MorseRoutine::new(Arc::clone(&motor), "e", 1.0, 4).unwrap()),
            Routine::Morse(MorseRoutine::new(Arc::clone(&motor), "t", 1.0, 4).unwrap()),
        ];
        Orchestrator::with_routines(motor, routines, transition).unwrap()
    }

    fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_from_settings() {
        let settings = ConfigStore::defaults().unwrap().settings().unwrap();
        let orch = Orchestrator::new(&settings, motor()).unwrap();

        assert_eq!(orch.routine_names(), &["MorseLogic", "YearLogic", "FlucLogic"]);
        assert_eq!(orch.transition_interval(), Duration::from_secs(300));
        assert_eq!(orch.active_index(), -1);
        assert_eq!(orch.active_routine(), None);
        assert!(!orch.is_running());
    }

    #[test]
    fn test_empty_routines_rejected() {
        let result = Orchestrator::with_routines(motor(), Vec::new(), Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NoRoutines))
        ));
    }

    #[test]
    fn test_stop_before_start() {
        let mut orch = orchestrator(Duration::from_secs(1));
        orch.stop();
        orch.stop();
        assert!(!orch.is_running());
    }

    #[test]
    fn test_start_activates_first_routine() {
        let mut orch = orchestrator(Duration::from_secs(60));
        orch.start().unwrap();
        orch.start().unwrap();

        assert!(wait_for(Duration::from_secs(2), || orch.active_index() == 0));
        assert_eq!(orch.active_routine(), Some("MorseLogic"));
        assert!(orch.is_running());

        let motor = Arc::clone(orch.motor());
        assert!(wait_for(Duration::from_secs(2), || motor.position() > 0));

        orch.stop();
        orch.stop();
        assert!(!orch.is_running());
        assert_eq!(orch.active_index(), -1);
    }

    #[test]
    fn test_routines_cycle() {
        let mut orch = orchestrator(Duration::from_millis(50));
        orch.start().unwrap();

        assert!(wait_for(Duration::from_secs(2), || orch.active_index() == 1));
        assert!(wait_for(Duration::from_secs(2), || orch.active_index() == 0));

        orch.stop();
    }

    #[test]
    fn test_restart_after_stop() {
        let mut orch = orchestrator(Duration::from_secs(60));
        orch.start().unwrap();
        orch.stop();

        orch.start().unwrap();
        assert!(orch.is_running());
        assert!(wait_for(Duration::from_secs(2), || orch.active_index() == 0));
        orch.stop();
    }

    #[test]
    fn test_drop_stops_threads() {
        let mut orch = orchestrator(Duration::from_secs(60));
        orch.start().unwrap();
        let motor = Arc::clone(orch.motor());

        let started = Instant::now();
        drop(orch);

        assert!(started.elapsed() < Duration::from_secs(5));
        // Only our handle is left once both threads have released theirs.
        assert_eq!(Arc::strong_count(&motor), 1);
    }
}
