/*!
 * Named, typed configuration values.
 *
 * On the wire an entry is a three element array `[name, tag, value]` where
 * `tag` is one of `"b"`, `"l"`, `"d"`, `"s"` and `value` has the matching
 * JSON type.
 */
use serde_json::json;

use opconfig_core::error::{Error, Result};
use opconfig_core::types::{json_type_name, Kind, Value};

/// A single named configuration value. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEntry {
    name: String,
    value: Value,
}

impl DataEntry {
    /// Build an entry from a typed value.
    ///
    /// Fails with [`Error::InvalidType`] for non-finite floats.
    pub fn new<S: Into<String>, V: Into<Value>>(name: S, value: V) -> Result<Self> {
        let value = value.into();
        if let Value::Double(f) = value {
            if !f.is_finite() {
                return Err(Error::invalid_type(format!("non-finite float {}", f)));
            }
        }
        Ok(Self {
            name: name.into(),
            value,
        })
    }

    /// Build an entry from a dynamically typed JSON value
    pub fn from_raw<S: Into<String>>(name: S, raw: &serde_json::Value) -> Result<Self> {
        Self::new(name, Value::from_json(raw)?)
    }

    /// Parse an entry from its `[name, tag, value]` form
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let parts = json
            .as_array()
            .ok_or_else(|| Error::malformed(format!("entry must be an array, got {}", json_type_name(json))))?;
        if parts.len() != 3 {
            return Err(Error::malformed(format!(
                "entry must have 3 elements, got {}",
                parts.len()
            )));
        }

        let name = parts[0]
            .as_str()
            .ok_or_else(|| Error::malformed("entry name must be a string"))?;
        let tag = parts[1]
            .as_str()
            .ok_or_else(|| Error::malformed(format!("entry '{}' has a non-string type tag", name)))?;
        let kind = Kind::from_tag(tag)
            .ok_or_else(|| Error::malformed(format!("entry '{}' has unknown type tag '{}'", name, tag)))?;

        let raw = &parts[2];
        let value = match kind {
            Kind::Bool => raw.as_bool().map(Value::Bool),
            Kind::Long => raw.as_i64().map(Value::Long),
            Kind::Double => raw.as_f64().map(Value::Double),
            Kind::String => raw.as_str().map(|s| Value::String(s.to_string())),
        }
        .ok_or_else(|| {
            Error::malformed(format!(
                "entry '{}' is tagged {} but holds a {}",
                name,
                kind,
                json_type_name(raw)
            ))
        })?;

        Ok(Self {
            name: name.to_string(),
            value,
        })
    }

    /// Encode as `[name, tag, value]`
    pub fn to_json(&self) -> serde_json::Value {
        let value = match &self.value {
            Value::Bool(b) => json!(b),
            Value::Long(i) => json!(i),
            Value::Double(f) => json!(f),
            Value::String(s) => json!(s),
        };
        json!([self.name, self.value.kind().tag(), value])
    }

    /// Entry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Kind of the entry value
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(entry: &DataEntry) -> DataEntry {
        DataEntry::from_json(&entry.to_json()).unwrap()
    }

    #[test]
    fn test_round_trip_every_kind() {
        let entries = [
            DataEntry::new("armed", true).unwrap(),
            DataEntry::new("ticks", -4096i64).unwrap(),
            DataEntry::new("ticks_max", i64::MAX).unwrap(),
            DataEntry::new("gain", 0.1f64).unwrap(),
            DataEntry::new("whole", 3.0f64).unwrap(),
            DataEntry::new("alliance", "red").unwrap(),
            DataEntry::new("empty", "").unwrap(),
        ];
        for entry in &entries {
            let parsed = round_trip(entry);
            assert_eq!(&parsed, entry);
            assert_eq!(parsed.kind(), entry.kind());
        }
    }

    #[test]
    fn test_to_json_shape() {
        let entry = DataEntry::new("speed", 0.5).unwrap();
        assert_eq!(entry.to_json(), json!(["speed", "d", 0.5]));

        let entry = DataEntry::new("count", 7i64).unwrap();
        assert_eq!(entry.to_json(), json!(["count", "l", 7]));

        let entry = DataEntry::new("on", false).unwrap();
        assert_eq!(entry.to_json(), json!(["on", "b", false]));

        let entry = DataEntry::new("label", "x").unwrap();
        assert_eq!(entry.to_json(), json!(["label", "s", "x"]));
    }

    #[test]
    fn test_whole_float_keeps_its_kind() {
        let entry = DataEntry::new("whole", 2.0f64).unwrap();
        let text = entry.to_json().to_string();
        let parsed = DataEntry::from_json(&serde_json::from_str(&text).unwrap()).unwrap();
        assert_eq!(parsed.kind(), Kind::Double);
        assert_eq!(parsed.value(), &Value::Double(2.0));
    }

    #[test]
    fn test_double_tag_accepts_integer_literal() {
        let entry = DataEntry::from_json(&json!(["gain", "d", 2])).unwrap();
        assert_eq!(entry.value(), &Value::Double(2.0));
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(
            DataEntry::from_raw("a", &json!(1)).unwrap().value(),
            &Value::Long(1)
        );
        assert_eq!(
            DataEntry::from_raw("a", &json!(1.5)).unwrap().value(),
            &Value::Double(1.5)
        );
        for bad in [json!(null), json!([true]), json!({"k": "v"})] {
            assert!(matches!(DataEntry::from_raw("a", &bad), Err(Error::InvalidType(_))));
        }
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert!(matches!(DataEntry::new("a", f64::NAN), Err(Error::InvalidType(_))));
        assert!(matches!(DataEntry::new("a", f64::NEG_INFINITY), Err(Error::InvalidType(_))));
    }

    #[test]
    fn test_from_json_malformed() {
        let cases = [
            json!(["a", "b"]),
            json!(["a", "b", true, 1]),
            json!({"a": true}),
            json!([1, "b", true]),
            json!(["a", 1, true]),
            json!(["a", "z", true]),
            json!(["a", "b", "true"]),
            json!(["a", "l", 1.5]),
            json!(["a", "s", 1]),
            json!(["a", "d", "1.0"]),
        ];
        for case in &cases {
            assert!(
                matches!(DataEntry::from_json(case), Err(Error::MalformedData(_))),
                "{} should be malformed",
                case
            );
        }
    }
}
