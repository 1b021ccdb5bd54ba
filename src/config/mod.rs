//! Configuration module for asterisk-mirror.
//!
//! Settings are resolved from built-in defaults layered with optional TOML
//! override files, then validated once at start-up.

mod kinds;
mod settings;
mod store;
mod validation;

pub use kinds::{lenient, SettingKind};
pub use settings::{
    FluctuationSettings, MorseSettings, Settings, SystemSettings, YearSettings, DEFAULT_CONFIG,
};
pub use store::{load_settings, ConfigStore, DEFAULT_CONFIG_PATH};
pub use validation::validate_settings;
