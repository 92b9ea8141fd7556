//! Document transcoding
//!
//! A [`Transcoder`] turns an application value into the `(bytes, content type)`
//! pair stored on the server and back again. [`JsonTranscoder`] is the
//! default and only handles JSON-representable values; [`RawBinaryTranscoder`]
//! passes opaque bytes through untouched.

use crate::error::{ClientError, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use stellar_proto as proto;

/// Application-level document content
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentValue {
    /// null, bool, number, string, array or object
    Json(Value),
    /// Opaque bytes
    Binary(Bytes),
}

impl DocumentValue {
    /// Convert any serializable value into JSON document content
    ///
    /// Values serde cannot express as JSON (maps with non-string keys,
    /// failing `Serialize` impls) are rejected as an unrecognized type.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(DocumentValue::Json)
            .map_err(|e| ClientError::ValueFormat(format!("unrecognized value type: {}", e)))
    }

    /// Deserialize the content into `T`
    ///
    /// Binary content is parsed as JSON text.
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            DocumentValue::Json(value) => Ok(serde_json::from_value(value.clone())?),
            DocumentValue::Binary(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            DocumentValue::Json(value) => Some(value),
            DocumentValue::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            DocumentValue::Json(_) => None,
            DocumentValue::Binary(bytes) => Some(bytes),
        }
    }
}

impl From<Value> for DocumentValue {
    fn from(value: Value) -> Self {
        DocumentValue::Json(value)
    }
}

impl From<Bytes> for DocumentValue {
    fn from(bytes: Bytes) -> Self {
        DocumentValue::Binary(bytes)
    }
}

impl From<Vec<u8>> for DocumentValue {
    fn from(bytes: Vec<u8>) -> Self {
        DocumentValue::Binary(Bytes::from(bytes))
    }
}

/// Content type tag sent alongside document bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Json,
    Binary,
    Unknown,
}

impl ContentType {
    pub fn to_wire(self) -> i32 {
        match self {
            ContentType::Json => proto::DocumentContentType::Json as i32,
            ContentType::Binary => proto::DocumentContentType::Binary as i32,
            ContentType::Unknown => proto::DocumentContentType::Unknown as i32,
        }
    }

    pub fn from_wire(value: i32) -> Self {
        match proto::DocumentContentType::try_from(value) {
            Ok(proto::DocumentContentType::Json) => ContentType::Json,
            Ok(proto::DocumentContentType::Binary) => ContentType::Binary,
            _ => ContentType::Unknown,
        }
    }
}

/// JSON (de)serialization capability used for documents and query rows
pub trait Serializer: Send + Sync + fmt::Debug {
    fn serialize(&self, value: &Value) -> Result<Bytes>;
    fn deserialize(&self, bytes: &[u8]) -> Result<Value>;
}

/// `serde_json` backed serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultJsonSerializer;

impl Serializer for DefaultJsonSerializer {
    fn serialize(&self, value: &Value) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Converts document values to and from their stored representation
pub trait Transcoder: Send + Sync + fmt::Debug {
    fn encode_value(&self, value: &DocumentValue) -> Result<(Bytes, ContentType)>;
    fn decode_value(&self, content: &[u8], content_type: ContentType) -> Result<DocumentValue>;
}

/// Default transcoder: JSON values only, via a pluggable [`Serializer`]
#[derive(Debug, Clone)]
pub struct JsonTranscoder {
    serializer: Arc<dyn Serializer>,
}

impl JsonTranscoder {
    pub fn new() -> Self {
        Self::with_serializer(Arc::new(DefaultJsonSerializer))
    }

    pub fn with_serializer(serializer: Arc<dyn Serializer>) -> Self {
        Self { serializer }
    }
}

impl Default for JsonTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcoder for JsonTranscoder {
    fn encode_value(&self, value: &DocumentValue) -> Result<(Bytes, ContentType)> {
        match value {
            DocumentValue::Json(value) => Ok((self.serializer.serialize(value)?, ContentType::Json)),
            DocumentValue::Binary(_) => Err(ClientError::ValueFormat(
                "binary content is not supported by the JSON transcoder".to_string(),
            )),
        }
    }

    fn decode_value(&self, content: &[u8], content_type: ContentType) -> Result<DocumentValue> {
        match content_type {
            ContentType::Json => Ok(DocumentValue::Json(self.serializer.deserialize(content)?)),
            ContentType::Binary => Err(ClientError::ValueFormat(
                "binary content cannot be decoded by the JSON transcoder".to_string(),
            )),
            ContentType::Unknown => Err(ClientError::ValueFormat(
                "unrecognized content type".to_string(),
            )),
        }
    }
}

/// Pass-through transcoder for opaque binary documents
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBinaryTranscoder;

impl Transcoder for RawBinaryTranscoder {
    fn encode_value(&self, value: &DocumentValue) -> Result<(Bytes, ContentType)> {
        match value {
            DocumentValue::Binary(bytes) => Ok((bytes.clone(), ContentType::Binary)),
            DocumentValue::Json(_) => Err(ClientError::ValueFormat(
                "only binary content is supported by the raw binary transcoder".to_string(),
            )),
        }
    }

    fn decode_value(&self, content: &[u8], content_type: ContentType) -> Result<DocumentValue> {
        match content_type {
            ContentType::Binary => Ok(DocumentValue::Binary(Bytes::copy_from_slice(content))),
            ContentType::Json => Err(ClientError::ValueFormat(
                "JSON content cannot be decoded by the raw binary transcoder".to_string(),
            )),
            ContentType::Unknown => Err(ClientError::ValueFormat(
                "unrecognized content type".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            (-4000i32..4000).prop_map(|n| json!(n as f64 * 0.25)),
            "[a-zA-Z0-9 _\\-]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::hash_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_json_round_trip(value in json_value()) {
            let transcoder = JsonTranscoder::default();
            let original = DocumentValue::Json(value);
            let (bytes, content_type) = transcoder.encode_value(&original).unwrap();
            prop_assert_eq!(content_type, ContentType::Json);
            let decoded = transcoder.decode_value(&bytes, content_type).unwrap();
            prop_assert_eq!(decoded, original);
        }
    }

    #[test]
    fn test_json_rejects_binary() {
        let transcoder = JsonTranscoder::default();
        let err = transcoder
            .encode_value(&DocumentValue::Binary(Bytes::from_static(b"\x00\x01")))
            .unwrap_err();
        assert!(matches!(err, ClientError::ValueFormat(_)));

        let err = transcoder.decode_value(b"\x00\x01", ContentType::Binary).unwrap_err();
        assert!(matches!(err, ClientError::ValueFormat(_)));

        let err = transcoder.decode_value(b"{}", ContentType::Unknown).unwrap_err();
        assert!(matches!(err, ClientError::ValueFormat(_)));
    }

    #[test]
    fn test_unrepresentable_value() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys");
        let err = DocumentValue::from_serialize(&map).unwrap_err();
        assert!(matches!(err, ClientError::ValueFormat(msg) if msg.contains("unrecognized value type")));
    }

    #[test]
    fn test_raw_binary_pass_through() {
        let transcoder = RawBinaryTranscoder;
        let value = DocumentValue::Binary(Bytes::from_static(b"\xde\xad\xbe\xef"));
        let (bytes, content_type) = transcoder.encode_value(&value).unwrap();
        assert_eq!(content_type, ContentType::Binary);
        assert_eq!(&bytes[..], b"\xde\xad\xbe\xef");
        assert_eq!(transcoder.decode_value(&bytes, content_type).unwrap(), value);
        assert!(transcoder.encode_value(&DocumentValue::Json(json!(1))).is_err());
    }

    #[test]
    fn test_content_as() {
        #[derive(serde::Deserialize, PartialEq, Debug)]
        struct User {
            name: String,
            age: u32,
        }

        let value = DocumentValue::Json(json!({"name": "Alice", "age": 30}));
        let user: User = value.content_as().unwrap();
        assert_eq!(user, User { name: "Alice".to_string(), age: 30 });

        let value = DocumentValue::Binary(Bytes::from_static(b"[1,2,3]"));
        let list: Vec<u8> = value.content_as().unwrap();
        assert_eq!(list, vec![1, 2, 3]);
    }

    #[test]
    fn test_content_type_wire_mapping() {
        for ct in [ContentType::Json, ContentType::Binary, ContentType::Unknown] {
            assert_eq!(ContentType::from_wire(ct.to_wire()), ct);
        }
        assert_eq!(ContentType::from_wire(99), ContentType::Unknown);
    }
}
