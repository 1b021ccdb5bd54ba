//! Registry of routine names.

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{truncated, ConfigError, Error, Result};
use crate::gpio::GpioDriver;
use crate::motor::MotorController;

use super::{FluctuationRoutine, MorseRoutine, Routine, YearRoutine};

/// The routines that can be named in `System.logics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutineKind {
    /// `MorseLogic`
    Morse,
    /// `YearLogic`
    Year,
    /// `FlucLogic`
    Fluctuation,
}

impl RoutineKind {
    /// Every registered kind.
    pub const ALL: [RoutineKind; 3] = [RoutineKind::Morse, RoutineKind::Year, RoutineKind::Fluctuation];

    /// Configured name of this kind.
    pub const fn name(self) -> &'static str {
        match self {
            RoutineKind::Morse => "MorseLogic",
            RoutineKind::Year => "YearLogic",
            RoutineKind::Fluctuation => "FlucLogic",
        }
    }

    /// Look a kind up by its configured name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRoutine` if no kind has this name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::Config(ConfigError::UnknownRoutine(truncated(name))))
    }

    /// Construct a routine of this kind from its settings section.
    ///
    /// # Errors
    ///
    /// Returns an error if the section holds unusable values.
    pub fn build<D: GpioDriver>(
        self,
        motor: Arc<MotorController<D>>,
        settings: &Settings,
    ) -> Result<Routine<D>> {
        Ok(match self {
            RoutineKind::Morse => Routine::Morse(MorseRoutine::from_settings(motor, &settings.morse)?),
            RoutineKind::Year => Routine::Year(YearRoutine::from_settings(motor, &settings.year)?),
            RoutineKind::Fluctuation => Routine::Fluctuation(FluctuationRoutine::from_settings(
                motor,
                &settings.fluctuation,
            )?),
        })
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoutineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Build the routines listed in `System.logics`, in order.
///
/// # Errors
///
/// Returns `NoRoutines` for an empty list, `UnknownRoutine` for an
/// unregistered name, or the first construction error.
pub fn build_routines<D: GpioDriver>(
    motor: &Arc<MotorController<D>>,
    settings: &Settings,
) -> Result<Vec<Routine<D>>> {
    if settings.system.logics.is_empty() {
        return Err(Error::Config(ConfigError::NoRoutines));
    }

    settings
        .system
        .logics
        .iter()
        .map(|name| RoutineKind::from_name(name)?.build(Arc::clone(motor), settings))
        .collect()
}
