//! Morse code routine.
//!
//! The message is encoded once at construction into a timing plan of marks
//! (forward rotation) and gaps (waits), all measured in dot units.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::MorseSettings;
use crate::error::{ConfigError, MotionError, Result};
use crate::gpio::GpioDriver;
use crate::motor::MotorController;

/// International Morse alphabet. A space maps to the word separator.
pub const MORSE_TABLE: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('0', "-----"),
    ('.', ".-.-.-"),
    (',', "--..--"),
    ('?', "..--.."),
    ('!', "-.-.--"),
    ('-', "-....-"),
    ('/', "-..-."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('&', ".-..."),
    (':', "---..."),
    (';', "-.-.-."),
    ('=', "-...-"),
    ('+', ".-.-."),
    ('_', "..--.-"),
    ('"', ".-..-."),
    ('@', ".--.-."),
    (' ', "/"),
];

/// Code for one character, ignoring case.
pub fn lookup(c: char) -> Option<&'static str> {
    let upper = c.to_ascii_uppercase();
    MORSE_TABLE
        .iter()
        .find(|(key, _)| *key == upper)
        .map(|(_, code)| *code)
}

/// Encode `message` as Morse code, letters separated by a single blank.
///
/// # Errors
///
/// Returns `UnmappedCharacter` for the first character with no code.
pub fn encode(message: &str) -> Result<String> {
    let mut codes = Vec::with_capacity(message.len());
    for c in message.chars() {
        codes.push(lookup(c).ok_or(ConfigError::UnmappedCharacter(c))?);
    }
    Ok(codes.join(" "))
}

/// One entry of a Morse timing plan, in dot units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorseElement {
    /// Rotate forward for this many units.
    Mark(u32),
    /// Stay still for this many units.
    Gap(u32),
}

impl MorseElement {
    /// Length in dot units.
    pub fn units(self) -> u32 {
        match self {
            MorseElement::Mark(n) | MorseElement::Gap(n) => n,
        }
    }
}

/// Silence appended after the last element, on top of its element gap.
pub const MESSAGE_GAP: u32 = 7;

/// Timing plan for an encoded message.
///
/// Every element is followed by a one-unit gap; a blank adds two more (letter
/// gap 3) and so does each `/` (word gap 7 across `" / "`).
pub fn timing_plan(code: &str) -> Vec<MorseElement> {
    let mut plan = Vec::with_capacity(code.len() * 2 + 1);
    for symbol in code.chars() {
        match symbol {
            '.' => plan.extend([MorseElement::Mark(1), MorseElement::Gap(1)]),
            '-' => plan.extend([MorseElement::Mark(3), MorseElement::Gap(1)]),
            ' ' | '/' => plan.push(MorseElement::Gap(2)),
            _ => {}
        }
    }
    plan.push(MorseElement::Gap(MESSAGE_GAP));
    plan
}

/// Duration of one dot unit.
///
/// A one-unit mark is `dot_steps` pulses of `pulse_unit / speed` each, so the
/// unit is their total.
///
/// # Errors
///
/// Returns an error if `speed` is not positive or `dot_steps` is 0.
pub fn unit_duration(pulse_unit: Duration, dot_steps: u32, speed: f64) -> Result<Duration> {
    if dot_steps == 0 {
        return Err(ConfigError::InvalidDotSteps(0).into());
    }
    if !(speed.is_finite() && speed > 0.0) {
        return Err(MotionError::InvalidSpeed(speed).into());
    }
    Duration::try_from_secs_f64(pulse_unit.as_secs_f64() * f64::from(dot_steps) / speed)
        .map_err(|_| MotionError::InvalidSpeed(speed).into())
}

/// Spells a message in Morse code with the motor.
pub struct MorseRoutine<D: GpioDriver> {
    motor: Arc<MotorController<D>>,
    message: String,
    code: String,
    plan: Vec<MorseElement>,
    speed: f64,
    dot_steps: u32,
    unit: Duration,
}

impl<D: GpioDriver> MorseRoutine<D> {
    /// Create a routine spelling `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be encoded, the speed is not
    /// positive or `dot_steps` is 0.
    pub fn new(
        motor: Arc<MotorController<D>>,
        message: &str,
        speed: f64,
        dot_steps: u32,
    ) -> Result<Self> {
        let code = encode(message)?;
        let unit = unit_duration(motor.pulse_unit(), dot_steps, speed)?;

        debug!(text = message, code = %code, ?unit, "morse routine ready");

        Ok(Self {
            motor,
            message: message.to_string(),
            plan: timing_plan(&code),
            code,
            speed,
            dot_steps,
            unit,
        })
    }

    /// Create from the `[MorseLogic]` section.
    ///
    /// # Errors
    ///
    /// See [`MorseRoutine::new`].
    pub fn from_settings(motor: Arc<MotorController<D>>, settings: &MorseSettings) -> Result<Self> {
        Self::new(motor, &settings.message, settings.speed, settings.steps)
    }

    /// The plain-text message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The encoded message.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The timing plan walked by each execution.
    pub fn plan(&self) -> &[MorseElement] {
        &self.plan
    }

    /// Duration of one dot unit.
    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Pulses per dot unit.
    pub fn dot_steps(&self) -> u32 {
        self.dot_steps
    }

    pub(crate) fn motor(&self) -> &Arc<MotorController<D>> {
        &self.motor
    }

    /// Spell the message once, stopping early when interrupted.
    pub fn execute(&self) -> Result<()> {
        info!(text = %self.message, code = %self.code, "spelling message");

        for element in &self.plan {
            let interrupted = match *element {
                MorseElement::Mark(units) => {
                    let steps = i64::from(units) * i64::from(self.dot_steps);
                    self.motor.rotate_by_steps(steps, self.speed)? != steps
                }
                MorseElement::Gap(units) => self.motor.wait(self.unit * units),
            };

            if interrupted || self.motor.is_interrupted() {
                debug!("message interrupted");
                break;
            }
        }

        Ok(())
    }
}
