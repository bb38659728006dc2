//! Raw-string codec of the pool driver.
//!
//! | Declared type | Stored string |
//! |---------------|---------------|
//! | `number`, `boolean`, `json_object`, `json_array` | JSON text |
//! | `byte_string`, `base64_text` | base64 of the bytes; text is stored as given |
//! | `text_string`, `xml_object` | the text itself |
//!
//! Non-text values declared as text are stored as their JSON rendering, so
//! `3` under `text_string` reads back as `"3"`. The text forms come from
//! [`instancedb::codec`], which the document driver reads through as well.

use instancedb::{
    DbError, DbResult, Decoded, Value, ValueType,
    codec::{decode_text, encode_text},
};

/// Renders `value` as the string stored for `value_type`.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] if the value cannot be rendered as
/// JSON text.
pub fn wrap(value: &Value, value_type: ValueType) -> DbResult<String> {
    if value_type.is_json() {
        return serde_json::to_string(&value.to_json()).map_err(|err| {
            DbError::serialization_with_source(format!("cannot encode {value_type} value"), err)
        });
    }
    Ok(encode_text(value))
}

/// Reads a stored string back as `value_type`.
///
/// Never fails: a string that does not decode as its type comes back as
/// text, flagged as degraded.
#[must_use]
pub fn unwrap(raw: String, value_type: ValueType) -> Decoded {
    decode_text(raw, value_type)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn any_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            ".*".prop_map(Value::Text),
            "[A-Za-z0-9+/]{0,12}".prop_map(Value::Text),
            proptest::collection::vec(any::<u8>(), 0..16)
                .prop_map(|b| Value::Bytes(Bytes::from(b))),
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::Bool),
            ("(_id|_text|_wrapped|[a-z]{1,4})", ".*")
                .prop_map(|(k, v)| Value::from(json!({ k: v }))),
            proptest::collection::vec(any::<i32>(), 0..4).prop_map(|v| Value::from(json!(v))),
        ]
    }

    fn any_type() -> impl Strategy<Value = ValueType> {
        prop_oneof![
            Just(ValueType::TextString),
            Just(ValueType::ByteString),
            Just(ValueType::Number),
            Just(ValueType::Boolean),
            Just(ValueType::JsonObject),
            Just(ValueType::JsonArray),
            Just(ValueType::XmlObject),
            Just(ValueType::Base64Text),
        ]
    }

    #[rstest]
    #[case::number(Value::from(42), ValueType::Number, "42")]
    #[case::boolean(Value::from(true), ValueType::Boolean, "true")]
    #[case::object(Value::from(json!({ "a": 1 })), ValueType::JsonObject, r#"{"a":1}"#)]
    #[case::array(Value::from(json!([1, "x"])), ValueType::JsonArray, r#"[1,"x"]"#)]
    #[case::text(Value::from("plain"), ValueType::TextString, "plain")]
    #[case::xml(Value::from("<a/>"), ValueType::XmlObject, "<a/>")]
    #[case::bytes(Value::from(b"png".to_vec()), ValueType::ByteString, "cG5n")]
    #[case::base64_text_input(Value::from("AAEC"), ValueType::ByteString, "AAEC")]
    #[case::number_as_text(Value::from(3), ValueType::TextString, "3")]
    #[case::object_as_text(Value::from(json!({ "a": 1 })), ValueType::TextString, r#"{"a":1}"#)]
    fn test_wrap_renders_declared_form(
        #[case] value: Value,
        #[case] value_type: ValueType,
        #[case] expected: &str,
    ) {
        assert_eq!(wrap(&value, value_type).unwrap(), expected);
    }

    #[test]
    fn test_json_text_value_is_quoted_for_json_types() {
        // A string declared as a JSON type is stored as a JSON string.
        assert_eq!(wrap(&Value::from("x"), ValueType::JsonObject).unwrap(), r#""x""#);
    }

    #[test]
    fn test_unwrap_parses_json_types() {
        let decoded = unwrap(r#"{"a":[1]}"#.to_owned(), ValueType::JsonObject);
        assert_eq!(decoded, Decoded::clean(Value::from(json!({ "a": [1] }))));
    }

    #[test]
    fn test_unwrap_keeps_text_raw() {
        let decoded = unwrap("42".to_owned(), ValueType::TextString);
        assert_eq!(decoded, Decoded::clean(Value::from("42")));
    }

    #[test]
    fn test_unwrap_base64_text_is_not_decoded() {
        let decoded = unwrap("cG5n".to_owned(), ValueType::Base64Text);
        assert_eq!(decoded, Decoded::clean(Value::from("cG5n")));
    }

    #[test]
    fn test_unwrap_decodes_binary() {
        let decoded = unwrap("AAEC".to_owned(), ValueType::ByteString);
        assert_eq!(decoded, Decoded::clean(Value::Bytes(Bytes::from_static(&[0, 1, 2]))));
    }

    #[rstest]
    #[case::malformed_json("not json", ValueType::Number)]
    #[case::malformed_base64("%%%", ValueType::ByteString)]
    fn test_unwrap_degrades_to_raw_text(#[case] raw: &str, #[case] value_type: ValueType) {
        let decoded = unwrap(raw.to_owned(), value_type);
        assert_eq!(decoded.value, Value::from(raw));
        assert!(decoded.degraded.is_some());
    }

    proptest! {
        #[test]
        fn test_bytes_round_trip(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let value = Value::Bytes(Bytes::from(data));
            let stored = wrap(&value, ValueType::ByteString).unwrap();
            prop_assert_eq!(unwrap(stored, ValueType::ByteString), Decoded::clean(value));
        }

        /// The raw-string and document forms read back identically, whatever
        /// types the value is written and read with.
        #[test]
        fn test_document_and_raw_forms_agree(
            value in any_value(),
            written in any_type(),
            read in any_type(),
        ) {
            let raw = wrap(&value, written).unwrap();
            let document = instancedb::document::wrap(&value, written);
            prop_assert_eq!(unwrap(raw, read), instancedb::document::unwrap(document, read));
        }

        #[test]
        fn test_text_round_trip(text in ".*") {
            let value = Value::from(text);
            let stored = wrap(&value, ValueType::TextString).unwrap();
            prop_assert_eq!(unwrap(stored, ValueType::TextString), Decoded::clean(value));
        }
    }
}
