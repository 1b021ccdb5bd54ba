//! Layered configuration store.
//!
//! The built-in [`DEFAULT_CONFIG`] is loaded first, then each override file is
//! merged on top of it key by key. Missing files are skipped.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use toml::{Table, Value};
use tracing::{debug, info};

use crate::error::{truncated, ConfigError, Error, Result};

use super::kinds::SettingKind;
use super::settings::{Settings, DEFAULT_CONFIG};
use super::validation::validate_settings;

/// Default override file location on the device.
pub const DEFAULT_CONFIG_PATH: &str = "/boot/asterisk-mirror.toml";

/// Merged view of the default settings and every override file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStore {
    table: Table,
}

impl ConfigStore {
    /// Store holding only the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the built-in defaults are malformed.
    pub fn defaults() -> Result<Self> {
        Ok(Self {
            table: parse_table(DEFAULT_CONFIG)?,
        })
    }

    /// Load the defaults, then merge `paths` in order. Later files win.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut store = Self::defaults()?;
        for path in paths {
            store.merge_file(path)?;
        }
        Ok(store)
    }

    /// Merge one override file. Returns `false` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                self.merge_str(&content)?;
                info!(path = %path.display(), "Loaded configuration overrides");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                Ok(false)
            }
            Err(e) => Err(Error::Config(ConfigError::IoError(truncated(
                &e.to_string(),
            )))),
        }
    }

    /// Merge overrides given as TOML text.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text is not valid TOML.
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let overlay = parse_table(content)?;
        merge_tables(&mut self.table, overlay);
        Ok(())
    }

    /// Raw value at a dotted path such as `"MorseLogic.message"`.
    pub fn value(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.table.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// Typed value at a dotted path, or `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if the key is present but cannot be coerced.
    pub fn get<T: SettingKind>(&self, path: &str) -> Result<Option<T>> {
        match self.value(path) {
            None => Ok(None),
            Some(value) => T::from_value(value).map(Some).ok_or_else(|| {
                Error::Config(ConfigError::InvalidValue {
                    key: truncated(path),
                    expected: T::NAME,
                })
            }),
        }
    }

    /// Typed value at a dotted path that must be present.
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` if absent, `InvalidValue` if not coercible.
    pub fn require<T: SettingKind>(&self, path: &str) -> Result<T> {
        self.get(path)?
            .ok_or_else(|| Error::Config(ConfigError::MissingKey(truncated(path))))
    }

    /// Resolve and validate the typed settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a section or key is malformed or fails validation.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = Value::Table(self.table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| {
                Error::Config(ConfigError::ParseError(truncated(e.message())))
            })?;

        validate_settings(&settings)?;

        Ok(settings)
    }
}

/// Load settings from the defaults plus one override file.
///
/// # Errors
///
/// Returns an error if the file exists but is unreadable or invalid.
///
/// # Example
///
/// ```rust,ignore
/// use asterisk_mirror::load_settings;
///
/// let settings = load_settings("/boot/asterisk-mirror.toml")?;
/// ```
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    ConfigStore::load(&[path])?.settings()
}

fn parse_table(content: &str) -> Result<Table> {
    content.parse::<Table>().map_err(|e| {
        Error::Config(ConfigError::ParseError(truncated(e.message())))
    })
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
