//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::routine::{morse, RoutineKind};

use super::Settings;

/// Validate resolved settings.
///
/// Checks:
/// - Motor pins are distinct
/// - Transition interval, pulse unit and revolution size are usable
/// - Every routine name is known and at least one is listed
/// - Speeds are positive and the fluctuation rate is within `[0, 1]`
/// - The Morse message can be encoded
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_system(&settings.system)?;

    validate_speed("MorseLogic.speed", settings.morse.speed)?;
    if settings.morse.steps == 0 {
        return Err(Error::Config(ConfigError::InvalidDotSteps(0)));
    }
    morse::encode(&settings.morse.message)?;

    validate_speed("YearLogic.speed", settings.year.speed)?;
    if !settings.year.utc_offset.is_finite() {
        return Err(Error::Config(ConfigError::InvalidValue {
            key: crate::error::truncated("YearLogic.utc_offset"),
            expected: "finite float",
        }));
    }

    validate_speed("FlucLogic.speed", settings.fluctuation.speed)?;
    let rate = settings.fluctuation.rate;
    if !(0.0..=1.0).contains(&rate) {
        return Err(Error::Config(ConfigError::InvalidRate(rate)));
    }

    Ok(())
}

fn validate_system(system: &super::SystemSettings) -> Result<()> {
    system.pins().validate()?;

    if system.transition == 0 {
        return Err(Error::Config(ConfigError::InvalidTransition(0)));
    }

    // Duration::try_from_secs_f64 would accept 0, which spins without waiting
    if !system.pulse_unit.is_finite() || system.pulse_unit <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidPulseUnit(system.pulse_unit)));
    }

    if system.steps_per_revolution < 2 {
        return Err(Error::Config(ConfigError::InvalidStepsPerRevolution(
            system.steps_per_revolution,
        )));
    }

    if system.logics.is_empty() {
        return Err(Error::Config(ConfigError::NoRoutines));
    }
    for name in &system.logics {
        RoutineKind::from_name(name)?;
    }

    Ok(())
}

fn validate_speed(key: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidSpeed { key, value }));
    }
    Ok(())
}
