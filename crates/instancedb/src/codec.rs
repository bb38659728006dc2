//! Pieces shared by the per-driver codecs.
//!
//! Each driver owns its own wrap/unwrap pair because the native value models
//! differ (structured documents vs. raw strings). What they share lives
//! here: base64 handling for binary data, the text form of values declared
//! with a non-JSON type, the [`Decoded`] outcome of an unwrap, and the
//! [`DecodeMonitor`] that makes permissive reads observable.
//!
//! Both drivers read a value back exactly as the raw-string form would:
//!
//! | Declared type | Written as | Read back as |
//! |---------------|------------|--------------|
//! | `number`, `boolean`, `json_object`, `json_array` | JSON | JSON, text stays text |
//! | `text_string`, `xml_object`, `base64_text` | [`encode_text`] | text |
//! | `byte_string` | [`encode_text`] | bytes decoded from base64 |
//!
//! Reads never fail on a malformed payload. The raw stored value is
//! returned instead, a warning is logged and the monitor's counter is
//! incremented.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;

use serde_json::Value as JsonValue;

use crate::types::{Value, ValueType};

/// Encodes bytes as standard (padded) base64.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard base64 into bytes.
///
/// # Errors
///
/// Returns the decoder's error when `text` is not valid base64.
pub fn decode_base64(text: &str) -> Result<Bytes, base64::DecodeError> {
    STANDARD.decode(text).map(Bytes::from)
}

/// Renders a value declared with a non-JSON type as text.
///
/// Text is kept as given, bytes become base64 and every other value becomes
/// its JSON text, so `3` renders as `"3"` and `{"a":1}` as `{"a":1}`.
#[must_use]
pub fn encode_text(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Bytes(bytes) => encode_base64(bytes),
        other => match other.to_json() {
            JsonValue::String(text) => text,
            json => json.to_string(),
        },
    }
}

/// Reads stored text back as `value_type`.
///
/// JSON types parse the text, `byte_string` decodes it as base64 and the
/// remaining types return it unchanged. Text that does not decode comes
/// back raw, flagged as degraded.
#[must_use]
pub fn decode_text(raw: String, value_type: ValueType) -> Decoded {
    match value_type {
        json_type if json_type.is_json() => match serde_json::from_str::<JsonValue>(&raw) {
            Ok(parsed) => Decoded::clean(Value::from(parsed)),
            Err(err) => Decoded::degraded(Value::Text(raw), err.to_string()),
        },
        ValueType::ByteString => match decode_base64(&raw) {
            Ok(bytes) => Decoded::clean(Value::Bytes(bytes)),
            Err(err) => Decoded::degraded(Value::Text(raw), err.to_string()),
        },
        _ => Decoded::clean(Value::Text(raw)),
    }
}

/// Outcome of unwrapping one stored payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The value handed back to the caller.
    pub value: Value,
    /// Why structural decoding failed, if it did. When set, `value` is the
    /// raw stored payload.
    pub degraded: Option<String>,
}

impl Decoded {
    /// A payload that decoded as its declared type.
    #[must_use]
    pub fn clean(value: Value) -> Self {
        Self { value, degraded: None }
    }

    /// A payload that did not decode and is passed through raw.
    #[must_use]
    pub fn degraded(raw: Value, reason: impl Into<String>) -> Self {
        Self { value: raw, degraded: Some(reason.into()) }
    }
}

/// Counts and logs reads that fell back to the raw stored value.
#[derive(Debug, Default)]
pub struct DecodeMonitor {
    failures: AtomicU64,
}

impl DecodeMonitor {
    /// Creates a monitor with a zero count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decoded value, recording it first if it is degraded.
    pub fn settle(&self, key: &str, value_type: ValueType, decoded: Decoded) -> Value {
        if let Some(reason) = decoded.degraded {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                key,
                value_type = %value_type,
                reason = %reason,
                "stored payload did not decode; returning raw value"
            );
        }
        decoded.value
    }

    /// Number of degraded reads seen so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
