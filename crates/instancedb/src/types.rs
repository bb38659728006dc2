//! Common types shared by drivers, the type resolver and the façades.
//!
//! - [`Owner`]: the executable or invoker an instance belongs to
//! - [`FieldKind`]: whether a named value is a parameter or a result
//! - [`ValueType`]: the declared serialization kind of a field
//! - [`Value`]: a typed application value, including binary buffers

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as JsonValue};

use crate::codec::encode_base64;

/// The owner of an instance.
///
/// Exactly one owner kind is ever used to build a key. When raw arguments
/// name both an executable and an invoker, the executable wins (see
/// [`Args`](crate::Args)).
///
/// # Examples
///
/// ```
/// use instancedb::Owner;
///
/// let owner = Owner::invoker("testinv");
/// assert_eq!(owner.kind(), "invoker");
/// assert_eq!(owner.name(), "testinv");
/// assert_eq!(owner.to_string(), "invoker:testinv");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    /// The instance belongs to an executable.
    Executable(String),
    /// The instance belongs to an invoker.
    Invoker(String),
}

impl Owner {
    /// Creates an executable owner.
    pub fn executable(name: impl Into<String>) -> Self {
        Self::Executable(name.into())
    }

    /// Creates an invoker owner.
    pub fn invoker(name: impl Into<String>) -> Self {
        Self::Invoker(name.into())
    }

    /// Returns the key segment naming the owner kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Executable(_) => "executable",
            Self::Invoker(_) => "invoker",
        }
    }

    /// Returns the owner's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Executable(name) | Self::Invoker(name) => name,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.name())
    }
}

/// Kind of named value attached to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// An input of the instance.
    Parameter,
    /// An output of the instance.
    Result,
}

impl FieldKind {
    /// Returns the key segment for this kind.
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::Result => "result",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Declared serialization kind of a field.
///
/// Schemas name these in `snake_case`. `binary` is accepted as an alias of
/// `byte_string`. [`ValueType::Base64Text`] never appears in a schema; the
/// type resolver substitutes it for `byte_string` when the caller prefers
/// base64 text over raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Plain text, stored raw.
    #[default]
    TextString,
    /// Binary data, stored as base64 and read back as bytes.
    #[serde(alias = "binary")]
    ByteString,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A JSON object.
    JsonObject,
    /// A JSON array.
    JsonArray,
    /// XML carried as text.
    XmlObject,
    /// Binary data read back as its base64 text instead of bytes.
    Base64Text,
}

impl ValueType {
    /// Returns `true` for the types whose raw-string form is JSON text.
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Number | Self::Boolean | Self::JsonObject | Self::JsonArray)
    }

    /// Returns the schema name of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextString => "text_string",
            Self::ByteString => "byte_string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::JsonObject => "json_object",
            Self::JsonArray => "json_array",
            Self::XmlObject => "xml_object",
            Self::Base64Text => "base64_text",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed application value.
///
/// Mirrors the JSON value model with one addition: [`Value::Bytes`] holds
/// real binary data. Converting to JSON renders bytes as standard base64.
///
/// # Examples
///
/// ```
/// use instancedb::Value;
/// use serde_json::json;
///
/// let value = Value::from(json!({ "retries": 3 }));
/// assert!(value.as_object().is_some());
///
/// let bytes = Value::from(b"\x00\x01".to_vec());
/// assert_eq!(bytes.to_json(), json!("AAE="));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(Number),
    /// Text (also used for XML).
    Text(String),
    /// Binary data.
    Bytes(Bytes),
    /// A JSON object.
    Object(Map<String, JsonValue>),
    /// A JSON array.
    Array(Vec<JsonValue>),
}

impl Value {
    /// Returns `true` for values that count as "not given": null, `false`,
    /// zero, the empty string and an empty byte buffer.
    ///
    /// Empty values are never stored. Objects and arrays are always kept,
    /// even when they have no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) => true,
            Self::Number(n) => n.as_f64() == Some(0.0),
            Self::Text(text) => text.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
            _ => false,
        }
    }

    /// Returns the text if this is a [`Value::Text`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the bytes if this is a [`Value::Bytes`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the map if this is a [`Value::Object`].
    #[must_use]
    pub fn as_object(&self) -> Option<&Map<String, JsonValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Converts into a JSON value, rendering bytes as base64 text.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => JsonValue::Number(n.clone()),
            Self::Text(text) => JsonValue::String(text.clone()),
            Self::Bytes(bytes) => JsonValue::String(encode_base64(bytes)),
            Self::Object(map) => JsonValue::Object(map.clone()),
            Self::Array(items) => JsonValue::Array(items.clone()),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n),
            JsonValue::String(s) => Self::Text(s),
            JsonValue::Array(items) => Self::Array(items),
            JsonValue::Object(map) => Self::Object(map),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

/// Non-finite floats have no JSON form and become [`Value::Null`].
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Self::from)
    }
}
