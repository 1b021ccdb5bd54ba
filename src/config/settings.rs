//! Resolved settings - root configuration structure.

use serde::Deserialize;

use crate::gpio::PinAssignment;

use super::kinds::lenient;

/// Built-in defaults. Override files only need the keys they change.
pub const DEFAULT_CONFIG: &str = r#"
[System]
# GPIO pin assignments (BCM numbering)
step_pin = 13
direction_pin = 19
enable_pin = 9

# routine transition interval (secs)
transition = 300

# routines, in cycling order
logics = "MorseLogic, YearLogic, FlucLogic"

# time of one step at speed 1.0 (secs)
pulse_unit = 0.001

# microsteps per revolution (200-step motor, 1/8 microstepping)
steps_per_revolution = 1600

[MorseLogic]
# message to encode as Morse code
message = "asterisk"

# stepper speed
speed = 1.0

# steps per dot
steps = 40

[YearLogic]
# stepper speed
speed = 1.0

# calendar offset from UTC (hours); 0 keeps the year in UTC,
# set e.g. -5.0 to follow local time at UTC-5
utc_offset = 0.0

[FlucLogic]
# stepper speed
speed = 1.0

# modulate the step interval
fluctuate = false

# fluctuation rate
rate = 0.5
"#;

/// Root settings, resolved once at start-up and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Hardware and orchestration settings.
    #[serde(rename = "System")]
    pub system: SystemSettings,

    /// Morse routine settings.
    #[serde(rename = "MorseLogic")]
    pub morse: MorseSettings,

    /// Year routine settings.
    #[serde(rename = "YearLogic")]
    pub year: YearSettings,

    /// Fluctuation routine settings.
    #[serde(rename = "FlucLogic")]
    pub fluctuation: FluctuationSettings,
}

/// `[System]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemSettings {
    /// STEP pin number.
    #[serde(deserialize_with = "lenient")]
    pub step_pin: u8,

    /// DIR pin number.
    #[serde(deserialize_with = "lenient")]
    pub direction_pin: u8,

    /// ENABLE pin number.
    #[serde(deserialize_with = "lenient")]
    pub enable_pin: u8,

    /// Seconds between routine switches.
    #[serde(deserialize_with = "lenient")]
    pub transition: u64,

    /// Routine names in cycling order.
    #[serde(deserialize_with = "lenient")]
    pub logics: Vec<String>,

    /// Seconds per step at speed 1.0.
    #[serde(deserialize_with = "lenient", default = "default_pulse_unit")]
    pub pulse_unit: f64,

    /// Microsteps per revolution.
    #[serde(deserialize_with = "lenient", default = "default_steps_per_revolution")]
    pub steps_per_revolution: u32,
}

impl SystemSettings {
    /// Pin numbers of the three motor lines.
    pub fn pins(&self) -> PinAssignment {
        PinAssignment::new(self.step_pin, self.direction_pin, self.enable_pin)
    }
}

fn default_pulse_unit() -> f64 {
    0.001
}

fn default_steps_per_revolution() -> u32 {
    crate::motor::DEFAULT_STEPS_PER_REVOLUTION
}

/// `[MorseLogic]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MorseSettings {
    /// Text to encode.
    #[serde(deserialize_with = "lenient")]
    pub message: String,

    /// Speed multiplier.
    #[serde(deserialize_with = "lenient")]
    pub speed: f64,

    /// Pulses per dot.
    #[serde(deserialize_with = "lenient")]
    pub steps: u32,
}

/// `[YearLogic]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct YearSettings {
    /// Speed multiplier.
    #[serde(deserialize_with = "lenient")]
    pub speed: f64,

    /// Calendar offset from UTC in hours.
    ///
    /// Defaults to 0, so the year follows UTC rather than the host time zone.
    #[serde(deserialize_with = "lenient", default)]
    pub utc_offset: f64,
}

/// `[FlucLogic]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FluctuationSettings {
    /// Speed multiplier.
    #[serde(deserialize_with = "lenient")]
    pub speed: f64,

    /// Whether the step interval follows the fluctuation recurrence.
    #[serde(deserialize_with = "lenient")]
    pub fluctuate: bool,

    /// Blend rate of the fluctuation into the step interval, in `[0, 1]`.
    #[serde(deserialize_with = "lenient")]
    pub rate: f64,
}
