/*!
 * Core value types for opconfig.
 *
 * A configuration value is always exactly one of four kinds. [`Kind`] names the
 * kind and owns the single-character wire tag, [`Value`] carries the payload.
 */
use std::fmt;

use crate::error::{Error, Result};

/// The closed set of kinds a configuration value can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Boolean, tag `"b"`
    Bool,
    /// 64-bit signed integer, tag `"l"`
    Long,
    /// 64-bit float, tag `"d"`
    Double,
    /// UTF-8 string, tag `"s"`
    String,
}

impl Kind {
    /// All kinds, in tag order
    pub const ALL: [Kind; 4] = [Kind::Bool, Kind::Long, Kind::Double, Kind::String];

    /// The wire tag for this kind
    pub fn tag(self) -> &'static str {
        match self {
            Kind::Bool => "b",
            Kind::Long => "l",
            Kind::Double => "d",
            Kind::String => "s",
        }
    }

    /// Look up a kind by its wire tag
    pub fn from_tag(tag: &str) -> Option<Kind> {
        match tag {
            "b" => Some(Kind::Bool),
            "l" => Some(Kind::Long),
            "d" => Some(Kind::Double),
            "s" => Some(Kind::String),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "boolean",
            Kind::Long => "integer",
            Kind::Double => "float",
            Kind::String => "string",
        };
        f.write_str(name)
    }
}

/// A configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Long(i64),
    /// Floating-point value
    Double(f64),
    /// String value
    String(String),
}

impl Value {
    /// The kind of this value
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Long(_) => Kind::Long,
            Value::Double(_) => Kind::Double,
            Value::String(_) => Kind::String,
        }
    }

    /// Try to get a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get an integer value
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get a float value
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a dynamic JSON value into a configuration value.
    ///
    /// Integers that fit in `i64` become [`Value::Long`], every other number
    /// becomes [`Value::Double`]. Null, arrays and objects are rejected with
    /// [`Error::InvalidType`].
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Long(i)),
                None => n
                    .as_f64()
                    .map(Value::Double)
                    .ok_or_else(|| Error::invalid_type(format!("unrepresentable number {}", n))),
            },
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            other => Err(Error::invalid_type(format!(
                "{} is not a boolean, integer, float or string",
                json_type_name(other)
            ))),
        }
    }

    /// Convert into a JSON value.
    ///
    /// Fails with [`Error::InvalidType`] for non-finite floats, which JSON
    /// cannot represent.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self {
            Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            Value::Long(i) => Ok(serde_json::Value::from(*i)),
            Value::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::invalid_type(format!("non-finite float {}", f))),
            Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        }
    }

    /// Parse user-entered text as a value of the given kind
    pub fn parse(kind: Kind, text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let parsed = match kind {
            Kind::Bool => trimmed.parse().map(Value::Bool).ok(),
            Kind::Long => trimmed.parse().map(Value::Long).ok(),
            Kind::Double => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Double),
            Kind::String => Some(Value::String(text.to_string())),
        };
        parsed.ok_or_else(|| Error::invalid_type(format!("'{}' is not a valid {}", text, kind)))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Long(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Long(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Double(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// A Rust type that maps onto exactly one [`Kind`].
///
/// This is what typed reads go through: the stored [`Value`] must be of
/// `Self::KIND` or the read fails.
pub trait ValueType: Sized + Clone {
    /// The kind this type is stored as
    const KIND: Kind;

    /// Wrap into a [`Value`]
    fn into_value(self) -> Value;

    /// Extract from a [`Value`] of the matching kind
    fn from_value(value: &Value) -> Option<Self>;
}

impl ValueType for bool {
    const KIND: Kind = Kind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl ValueType for i64 {
    const KIND: Kind = Kind::Long;

    fn into_value(self) -> Value {
        Value::Long(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_long()
    }
}

impl ValueType for f64 {
    const KIND: Kind = Kind::Double;

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_double()
    }
}

impl ValueType for String {
    const KIND: Kind = Kind::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// Human-readable name of a JSON value's type, for diagnostics
pub fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
