//! Value types flowing through reconstruction
//!
//! `BindingValue` is a single decoded cell of a result row. `OutputValue` and
//! `OutputObject` form the nested object graph produced by the reconstructor.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// A scalar bound to a variable in one result row.
///
/// Equality is term identity: doubles compare by bit pattern, so `NaN`
/// equals itself and rows sharing a `NaN` key land in one group.
#[derive(Debug, Clone)]
pub enum BindingValue {
    Uri(String),
    /// Opaque node identity; only meaningful within one result set
    BlankNode(String),
    String(String),
    LangString {
        value: String,
        lang: String,
    },
    /// Literal with a datatype that has no native counterpart
    Typed {
        value: String,
        datatype: String,
    },
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    /// dateTime literal without a timezone offset
    LocalDateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl PartialEq for BindingValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BindingValue::Uri(a), BindingValue::Uri(b))
            | (BindingValue::BlankNode(a), BindingValue::BlankNode(b))
            | (BindingValue::String(a), BindingValue::String(b)) => a == b,
            (
                BindingValue::LangString { value: a, lang: la },
                BindingValue::LangString { value: b, lang: lb },
            ) => a == b && la == lb,
            (
                BindingValue::Typed { value: a, datatype: da },
                BindingValue::Typed { value: b, datatype: db },
            ) => a == b && da == db,
            (BindingValue::Integer(a), BindingValue::Integer(b)) => a == b,
            (BindingValue::Double(a), BindingValue::Double(b)) => a.to_bits() == b.to_bits(),
            (BindingValue::Boolean(a), BindingValue::Boolean(b)) => a == b,
            (BindingValue::Date(a), BindingValue::Date(b)) => a == b,
            (BindingValue::DateTime(a), BindingValue::DateTime(b)) => a == b,
            (BindingValue::LocalDateTime(a), BindingValue::LocalDateTime(b)) => a == b,
            (BindingValue::Time(a), BindingValue::Time(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for BindingValue {}

impl BindingValue {
    /// Truthiness of a single scalar: empty strings, zero and `false` are empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            BindingValue::Uri(s) | BindingValue::BlankNode(s) | BindingValue::String(s) => {
                !s.is_empty()
            }
            BindingValue::LangString { value, .. } | BindingValue::Typed { value, .. } => {
                !value.is_empty()
            }
            BindingValue::Integer(i) => *i != 0,
            BindingValue::Double(f) => *f != 0.0,
            BindingValue::Boolean(b) => *b,
            BindingValue::Date(_)
            | BindingValue::DateTime(_)
            | BindingValue::LocalDateTime(_)
            | BindingValue::Time(_) => true,
        }
    }

    /// Lexical form, as it would appear inside a quoted literal.
    pub fn lexical(&self) -> String {
        match self {
            BindingValue::Uri(s) | BindingValue::BlankNode(s) | BindingValue::String(s) => {
                s.clone()
            }
            BindingValue::LangString { value, .. } | BindingValue::Typed { value, .. } => {
                value.clone()
            }
            BindingValue::Integer(i) => i.to_string(),
            BindingValue::Double(f) => f.to_string(),
            BindingValue::Boolean(b) => b.to_string(),
            BindingValue::Date(d) => d.to_string(),
            BindingValue::DateTime(dt) => dt.to_rfc3339(),
            BindingValue::LocalDateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            BindingValue::Time(t) => t.to_string(),
        }
    }

    /// Convert a plain JSON scalar. Arrays, objects and null have no binding form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(BindingValue::String(s.clone())),
            Value::Bool(b) => Some(BindingValue::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(BindingValue::Integer(i)),
                None => n.as_f64().map(BindingValue::Double),
            },
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            BindingValue::Integer(i) => Value::from(*i),
            BindingValue::Double(f) => Value::from(*f),
            BindingValue::Boolean(b) => Value::Bool(*b),
            other => Value::String(other.lexical()),
        }
    }
}

impl fmt::Display for BindingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingValue::Uri(uri) => write!(f, "<{}>", uri),
            BindingValue::BlankNode(id) => write!(f, "_:{}", id),
            BindingValue::LangString { value, lang } => write!(f, "\"{}\"@{}", value, lang),
            BindingValue::Typed { value, datatype } => write!(f, "\"{}\"^^<{}>", value, datatype),
            BindingValue::String(s) => write!(f, "\"{}\"", s),
            other => f.write_str(&other.lexical()),
        }
    }
}

impl Serialize for BindingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BindingValue::Integer(i) => serializer.serialize_i64(*i),
            BindingValue::Double(f) => serializer.serialize_f64(*f),
            BindingValue::Boolean(b) => serializer.serialize_bool(*b),
            other => serializer.serialize_str(&other.lexical()),
        }
    }
}

impl From<&str> for BindingValue {
    fn from(value: &str) -> Self {
        BindingValue::String(value.to_string())
    }
}

impl From<String> for BindingValue {
    fn from(value: String) -> Self {
        BindingValue::String(value)
    }
}

impl From<i64> for BindingValue {
    fn from(value: i64) -> Self {
        BindingValue::Integer(value)
    }
}

impl From<f64> for BindingValue {
    fn from(value: f64) -> Self {
        BindingValue::Double(value)
    }
}

impl From<bool> for BindingValue {
    fn from(value: bool) -> Self {
        BindingValue::Boolean(value)
    }
}

/// Field value of a reconstructed object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OutputValue {
    #[default]
    Null,
    Scalar(BindingValue),
    Object(OutputObject),
    List(Vec<OutputValue>),
}

impl OutputValue {
    pub fn is_null(&self) -> bool {
        matches!(self, OutputValue::Null)
    }

    /// Null, empty scalars and empty lists are falsy; nested objects are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            OutputValue::Null => false,
            OutputValue::Scalar(value) => value.is_truthy(),
            OutputValue::Object(_) => true,
            OutputValue::List(items) => !items.is_empty(),
        }
    }

    pub fn as_scalar(&self) -> Option<&BindingValue> {
        match self {
            OutputValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&OutputObject> {
        match self {
            OutputValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[OutputValue]> {
        match self {
            OutputValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert JSON into an output value. JSON objects become anonymous objects
    /// whose fields keep the map's order.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => OutputValue::Null,
            Value::Array(items) => OutputValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => {
                let mut object = OutputObject::new("");
                for (key, item) in map {
                    object.push(key.clone(), Self::from_json(item));
                }
                OutputValue::Object(object)
            }
            scalar => BindingValue::from_json(scalar)
                .map(OutputValue::Scalar)
                .unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            OutputValue::Null => Value::Null,
            OutputValue::Scalar(value) => value.to_json(),
            OutputValue::Object(object) => object.to_json(),
            OutputValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
        }
    }
}

impl From<Option<&BindingValue>> for OutputValue {
    fn from(value: Option<&BindingValue>) -> Self {
        value.cloned().map(OutputValue::Scalar).unwrap_or_default()
    }
}

impl From<BindingValue> for OutputValue {
    fn from(value: BindingValue) -> Self {
        OutputValue::Scalar(value)
    }
}

macro_rules! scalar_output_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for OutputValue {
                fn from(value: $ty) -> Self {
                    OutputValue::Scalar(BindingValue::from(value))
                }
            }
        )*
    };
}

scalar_output_from!(&str, String, i64, f64, bool);

impl From<OutputObject> for OutputValue {
    fn from(value: OutputObject) -> Self {
        OutputValue::Object(value)
    }
}

impl Serialize for OutputValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OutputValue::Null => serializer.serialize_none(),
            OutputValue::Scalar(value) => value.serialize(serializer),
            OutputValue::Object(object) => object.serialize(serializer),
            OutputValue::List(items) => items.serialize(serializer),
        }
    }
}

/// One instance of a schema node: field name to value, in schema field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputObject {
    node: String,
    fields: Vec<(String, OutputValue)>,
}

impl OutputObject {
    pub fn new(node: impl Into<String>) -> Self {
        OutputObject {
            node: node.into(),
            fields: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: OutputValue) {
        self.fields.push((name.into(), value));
    }

    /// Name of the schema node this object was built from.
    pub fn node_name(&self) -> &str {
        &self.node
    }

    pub fn get(&self, field: &str) -> Option<&OutputValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &OutputValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl Serialize for OutputObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
