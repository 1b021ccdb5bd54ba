//! Year routine: points the rotor at the elapsed fraction of the year.
//!
//! Half a revolution per year fraction doubled means one full turn per year,
//! with 1 January at position 0.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::config::YearSettings;
use crate::error::Result;
use crate::gpio::GpioDriver;
use crate::motor::MotorController;

/// Pause after each update.
pub const SETTLE_TIME: Duration = Duration::from_secs(10);

const SECS_PER_DAY: i64 = 86_400;

/// Days since 1970-01-01 of a proleptic Gregorian date.
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = i64::from(month);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Proleptic Gregorian date of a day count since 1970-01-01.
pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Midnight UTC of a calendar date.
pub fn utc_midnight(year: i64, month: u32, day: u32) -> SystemTime {
    let secs = days_from_civil(year, month, day) * SECS_PER_DAY;
    let offset = Duration::from_secs(secs.unsigned_abs());
    if secs >= 0 {
        UNIX_EPOCH + offset
    } else {
        UNIX_EPOCH - offset
    }
}

fn unix_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Fraction of the calendar year elapsed at `time`, in `[0, 1)`.
///
/// The calendar is UTC shifted by `utc_offset_hours`; the host time zone is
/// never consulted.
pub fn year_fraction(time: SystemTime, utc_offset_hours: f64) -> f64 {
    let local = unix_seconds(time) + utc_offset_hours * 3600.0;
    let days = libm::floor(local / SECS_PER_DAY as f64) as i64;
    let (year, _, _) = civil_from_days(days);

    let begin = (days_from_civil(year, 1, 1) * SECS_PER_DAY) as f64;
    let end = (days_from_civil(year + 1, 1, 1) * SECS_PER_DAY) as f64;
    ((local - begin) / (end - begin)).clamp(0.0, 1.0)
}

/// Moves the rotor to the current position in the year, then settles.
pub struct YearRoutine<D: GpioDriver> {
    motor: Arc<MotorController<D>>,
    speed: f64,
    utc_offset_hours: f64,
    reference: Option<SystemTime>,
    settle: Duration,
}

impl<D: GpioDriver> YearRoutine<D> {
    /// Create a routine following the wall clock.
    ///
    /// # Errors
    ///
    /// Returns an error if `speed` is not positive.
    pub fn new(motor: Arc<MotorController<D>>, speed: f64, utc_offset_hours: f64) -> Result<Self> {
        motor.step_interval(speed)?;
        Ok(Self {
            motor,
            speed,
            utc_offset_hours,
            reference: None,
            settle: SETTLE_TIME,
        })
    }

    /// Create from the `[YearLogic]` section.
    ///
    /// # Errors
    ///
    /// See [`YearRoutine::new`].
    pub fn from_settings(motor: Arc<MotorController<D>>, settings: &YearSettings) -> Result<Self> {
        Self::new(motor, settings.speed, settings.utc_offset)
    }

    /// Use a fixed time instead of the wall clock.
    pub fn with_reference(mut self, time: SystemTime) -> Self {
        self.reference = Some(time);
        self
    }

    /// Override the pause after each update.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub(crate) fn motor(&self) -> &Arc<MotorController<D>> {
        &self.motor
    }

    /// Target angle in half-turns, in `[0, 2)`.
    pub fn target_angle(&self) -> f64 {
        let now = self.reference.unwrap_or_else(SystemTime::now);
        2.0 * year_fraction(now, self.utc_offset_hours)
    }

    /// Rotate to the target angle, then wait the settle time.
    pub fn execute(&self) -> Result<()> {
        let angle = self.target_angle();
        info!(degrees = angle * 180.0, "moving to year position");

        self.motor.rotate_to_angle(angle, self.speed)?;
        self.motor.wait(self.settle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::SimulatedGpio;
    use crate::motor::MotorControllerBuilder;

    #[test]
    fn test_civil_round_trip_known_dates() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        assert_eq!(days_from_civil(1969, 12, 31), -1);
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn test_year_fraction_2018_06_02() {
        let fraction = year_fraction(utc_midnight(2018, 6, 2), 0.0);
        let degrees = fraction * 2.0 * 180.0;
        assert_eq!(degrees.round(), 150.0);
    }

    #[test]
    fn test_year_fraction_bounds() {
        assert_eq!(year_fraction(utc_midnight(2020, 1, 1), 0.0), 0.0);

        let late = utc_midnight(2021, 1, 1) - Duration::from_secs(1);
        let fraction = year_fraction(late, 0.0);
        assert!(fraction > 0.999 && fraction < 1.0);
    }

    #[test]
    fn test_utc_offset_shifts_year() {
        // 2019-01-01 00:00 UTC is still 2018 at UTC-5.
        let fraction = year_fraction(utc_midnight(2019, 1, 1), -5.0);
        assert!(fraction > 0.99);
    }

    #[test]
    fn test_from_settings_applies_offset() {
        use crate::config::{ConfigStore, YearSettings};

        let defaults = ConfigStore::defaults().unwrap().settings().unwrap();
        assert_eq!(defaults.year.utc_offset, 0.0);

        let motor = Arc::new(
            MotorControllerBuilder::new()
                .pulse_unit(Duration::ZERO)
                .build(SimulatedGpio::new())
                .unwrap(),
        );
        let new_year = utc_midnight(2019, 1, 1);

        let utc = YearRoutine::from_settings(Arc::clone(&motor), &defaults.year)
            .unwrap()
            .with_reference(new_year);
        assert_eq!(utc.target_angle(), 0.0);

        let settings = YearSettings {
            speed: 1.0,
            utc_offset: -5.0,
        };
        let shifted = YearRoutine::from_settings(motor, &settings)
            .unwrap()
            .with_reference(new_year);
        assert!(shifted.target_angle() > 1.99, "angle {}", shifted.target_angle());
    }

    #[test]
    fn test_execute_moves_to_fraction() {
        let motor = MotorControllerBuilder::new()
            .pulse_unit(Duration::ZERO)
            .build(SimulatedGpio::new())
            .unwrap();
        let routine = YearRoutine::new(Arc::new(motor), 1.0, 0.0)
            .unwrap()
            .with_reference(utc_midnight(2018, 7, 2))
            .with_settle(Duration::ZERO);

        routine.execute().unwrap();

        // 182 of 365 days: 1600 * 182 / 365 = 797.8
        assert_eq!(routine.motor().position(), 798);
    }
}
