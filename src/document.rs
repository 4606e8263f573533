use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Value};
use std::fmt;

/// A parsed date-time. Values written with an offset keep it, values
/// without one stay naive and are treated as UTC when stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    pub fn timestamp_millis(&self) -> i64 {
        match self {
            Timestamp::Zoned(datetime) => datetime.timestamp_millis(),
            Timestamp::Naive(datetime) => datetime.and_utc().timestamp_millis(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Zoned(datetime) => {
                write!(f, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.f%:z"))
            }
            Timestamp::Naive(datetime) => write!(f, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Timestamp(Timestamp),
    String(String),
}

impl TypedValue {
    /// JSON rendering used for dumps and diagnostics. Non-finite floats have
    /// no JSON form and become null.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Boolean(value) => Value::Bool(*value),
            TypedValue::Integer(value) => Value::from(*value),
            TypedValue::Float(value) => Value::from(*value),
            TypedValue::Timestamp(value) => Value::String(value.to_string()),
            TypedValue::String(value) => Value::String(value.clone()),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => Ok(()),
            TypedValue::Boolean(value) => write!(f, "{value}"),
            TypedValue::Integer(value) => write!(f, "{value}"),
            // Debug keeps the `.0` on whole numbers so the text reads back as a float.
            TypedValue::Float(value) => write!(f, "{value:?}"),
            TypedValue::Timestamp(value) => write!(f, "{value}"),
            TypedValue::String(value) => f.write_str(value),
        }
    }
}

/// Field name to typed value, in the order the fields were first seen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedDocument {
    fields: Vec<(String, TypedValue)>,
}

impl TypedDocument {
    pub fn new() -> TypedDocument {
        TypedDocument { fields: vec![] }
    }

    pub fn with_capacity(capacity: usize) -> TypedDocument {
        TypedDocument {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Inserts a field. An existing field keeps its position and has its
    /// value replaced; the old value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: TypedValue) -> Option<TypedValue> {
        let key = key.into();
        if let Some((_, existing)) = self.fields.iter_mut().find(|(name, _)| *name == key) {
            return Some(std::mem::replace(existing, value));
        }
        self.fields.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            object.insert(name.clone(), value.to_json());
        }
        Value::Object(object)
    }
}

impl<K: Into<String>> FromIterator<(K, TypedValue)> for TypedDocument {
    fn from_iter<I: IntoIterator<Item = (K, TypedValue)>>(iter: I) -> Self {
        let mut document = TypedDocument::new();
        for (key, value) in iter {
            document.insert(key, value);
        }
        document
    }
}
