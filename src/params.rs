//! Loosely-typed parameter bag for action inputs.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{Error, Result, ValidationError};

/// How presence of a required parameter is judged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// Missing when absent, `null`, or a blank string.
    Value,
    /// As [`Presence::Value`], and also missing when an empty array.
    NonEmptyArray,
}

/// Action input: a JSON object carrying credentials, discriminant and parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ValidationError::new(format!(
                "action input must be a JSON object, got {}",
                kind_of(&other)
            ))
            .into()),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_present(&self, key: &str, presence: Presence) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => presence != Presence::NonEmptyArray || !items.is_empty(),
            Some(_) => true,
        }
    }

    /// Required string. Numbers are rendered so ids given as `123` work.
    pub fn str(&self, key: &str) -> Result<String> {
        self.opt_str(key)?.ok_or_else(|| Error::missing([key]))
    }

    /// Optional string; blank strings read as absent.
    pub fn opt_str(&self, key: &str) -> Result<Option<String>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(type_error(key, "a string", other)),
        }
    }

    pub fn u64(&self, key: &str) -> Result<u64> {
        self.opt_u64(key)?.ok_or_else(|| Error::missing([key]))
    }

    /// Optional unsigned integer given as a number or numeric string.
    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
                .map(Some)
                .ok_or_else(|| type_error(key, "a non-negative integer", &Value::Number(n.clone()))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| type_error(key, "a non-negative integer", &Value::String(s.clone()))),
            Some(other) => Err(type_error(key, "a non-negative integer", other)),
        }
    }

    /// Optional signed integer (inventory adjustments may be negative).
    pub fn opt_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| type_error(key, "an integer", &Value::Number(n.clone()))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| type_error(key, "an integer", &Value::String(s.clone()))),
            Some(other) => Err(type_error(key, "an integer", other)),
        }
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(other) => Err(type_error(key, "a boolean", other)),
        }
    }

    /// Required value of any JSON type, returned as-is.
    pub fn value(&self, key: &str) -> Result<Value> {
        self.opt_value(key).ok_or_else(|| Error::missing([key]))
    }

    pub fn opt_value(&self, key: &str) -> Option<Value> {
        match self.0.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        }
    }

    /// Required JSON object.
    pub fn object(&self, key: &str) -> Result<Map<String, Value>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Err(Error::missing([key])),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(type_error(key, "an object", other)),
        }
    }

    /// Decode a parameter into a typed value.
    pub fn typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.opt_value(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|err| {
                ValidationError::new(err.to_string()).with_field(key).into()
            }),
        }
    }

    /// Array of strings; a comma-separated string is accepted too.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(type_error(key, "an array of strings", other)),
                })
                .collect(),
            Some(Value::String(s)) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()),
            Some(other) => Err(type_error(key, "an array of strings", other)),
        }
    }

    /// Every entry except the listed keys (extra-field passthrough).
    pub fn without(&self, keys: &[&str]) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(k, v)| !keys.contains(&k.as_str()) && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(key: &str, expected: &str, got: &Value) -> Error {
    ValidationError::new(format!("must be {expected}, got {}", kind_of(got)))
        .with_field(key)
        .into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Params {
        Params::from_value(value).unwrap()
    }

    #[test]
    fn presence_rule_treats_null_and_blank_as_missing() {
        let p = params(json!({
            "a": null, "b": "", "c": "  ", "d": 0, "e": false, "f": [], "g": "x"
        }));
        assert!(!p.is_present("a", Presence::Value));
        assert!(!p.is_present("b", Presence::Value));
        assert!(!p.is_present("c", Presence::Value));
        assert!(p.is_present("d", Presence::Value));
        assert!(p.is_present("e", Presence::Value));
        assert!(p.is_present("f", Presence::Value));
        assert!(!p.is_present("f", Presence::NonEmptyArray));
        assert!(p.is_present("g", Presence::Value));
        assert!(!p.is_present("missing", Presence::Value));
    }

    #[test]
    fn numeric_ids_read_as_strings() {
        let p = params(json!({"customerId": 207119551}));
        assert_eq!(p.str("customerId").unwrap(), "207119551");
    }

    #[test]
    fn u64_accepts_numeric_strings_and_rejects_garbage() {
        let p = params(json!({"limit": "25", "bad": "many", "n": 7}));
        assert_eq!(p.opt_u64("limit").unwrap(), Some(25));
        assert_eq!(p.opt_u64("n").unwrap(), Some(7));
        let err = p.opt_u64("bad").unwrap_err();
        assert_eq!(err.to_string(), "bad: must be a non-negative integer, got string");
    }

    #[test]
    fn string_list_accepts_array_or_csv() {
        let p = params(json!({"ids": ["1:2", "3:4"], "csv": "a, b,,c"}));
        assert_eq!(p.string_list("ids").unwrap(), vec!["1:2", "3:4"]);
        assert_eq!(p.string_list("csv").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn without_drops_listed_and_null_keys() {
        let p = params(json!({"action": "x", "token": "t", "labels": ["a"], "x": null}));
        let rest = p.without(&["action", "token"]);
        assert_eq!(Value::Object(rest), json!({"labels": ["a"]}));
    }

    #[test]
    fn non_object_input_is_rejected() {
        let err = Params::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "action input must be a JSON object, got array");
    }
}
