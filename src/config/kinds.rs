//! Typed setting values.
//!
//! Settings files are edited by hand, so values are coerced leniently: numbers
//! and booleans may be quoted (`"300"`, `"False"`) and lists may be written as
//! one comma-separated string.

use serde::de::{Deserialize, Deserializer, Error as _};
use toml::Value;

/// A type a setting value can be resolved to.
pub trait SettingKind: Sized {
    /// Type name used in error messages.
    const NAME: &'static str;

    /// Convert a raw TOML value, or `None` if it does not fit.
    fn from_value(value: &Value) -> Option<Self>;
}

impl SettingKind for String {
    const NAME: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl SettingKind for bool {
    const NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(*b),
            Value::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl SettingKind for i64 {
    const NAME: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(*f as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

macro_rules! unsigned_kind {
    ($($ty:ty),*) => {
        $(
            impl SettingKind for $ty {
                const NAME: &'static str = stringify!($ty);

                fn from_value(value: &Value) -> Option<Self> {
                    i64::from_value(value).and_then(|i| <$ty>::try_from(i).ok())
                }
            }
        )*
    };
}

unsigned_kind!(u8, u32, u64);

impl SettingKind for f64 {
    const NAME: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl SettingKind for Vec<String> {
    const NAME: &'static str = "list of strings";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

/// Serde adapter applying [`SettingKind`] coercion to a field.
///
/// Use with `#[serde(deserialize_with = "lenient")]`.
pub fn lenient<'de, D, T>(deserializer: D) -> core::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: SettingKind,
{
    let value = Value::deserialize(deserializer)?;
    T::from_value(&value).ok_or_else(|| {
        D::Error::custom(format_args!(
            "expected {}, found {}",
            T::NAME,
            value.type_str()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_scalars() {
        assert_eq!(i64::from_value(&Value::String("300".into())), Some(300));
        assert_eq!(f64::from_value(&Value::String("0.5".into())), Some(0.5));
        assert_eq!(bool::from_value(&Value::String("False".into())), Some(false));
        assert_eq!(bool::from_value(&Value::String("yes".into())), None);
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(f64::from_value(&Value::Integer(300)), Some(300.0));
        assert_eq!(u8::from_value(&Value::Integer(13)), Some(13));
        assert_eq!(u8::from_value(&Value::Integer(300)), None);
        assert_eq!(u64::from_value(&Value::Integer(-1)), None);
    }

    #[test]
    fn test_comma_list() {
        let value = Value::String("MorseLogic, YearLogic,FlucLogic,".into());
        assert_eq!(
            Vec::<String>::from_value(&value),
            Some(vec![
                "MorseLogic".to_string(),
                "YearLogic".to_string(),
                "FlucLogic".to_string()
            ])
        );
    }

    #[test]
    fn test_array_list() {
        let value = Value::Array(vec![Value::String("YearLogic".into()), Value::Integer(3)]);
        assert_eq!(Vec::<String>::from_value(&value), None);
    }
}
