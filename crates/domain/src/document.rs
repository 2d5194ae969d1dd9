//! Loosely-typed store documents and typed decode helpers.
//!
//! The remote store trades in key/value documents. Everything crossing that
//! boundary goes through [`decode`]/[`encode`] so that malformed documents
//! fail closed with a [`DomainError::Malformed`] instead of silently
//! producing partial entities.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DomainError;

/// A loosely-typed store document.
pub type Document = serde_json::Value;

/// Decodes a document into a typed model, validating required fields.
pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T, DomainError> {
    serde_json::from_value(doc).map_err(|e| DomainError::Malformed(e.to_string()))
}

/// Encodes a typed model into a store document.
pub fn encode<T: Serialize>(value: &T) -> Result<Document, DomainError> {
    serde_json::to_value(value).map_err(|e| DomainError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Probe {
        name: String,
        count: i64,
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let probe = Probe {
            name: "alpha".to_string(),
            count: 3,
        };
        let doc = encode(&probe).unwrap();
        let back: Probe = decode(doc).unwrap();
        assert_eq!(back, probe);
    }

    #[test]
    fn test_decode_missing_required_field_fails_closed() {
        let doc = serde_json::json!({ "name": "alpha" });
        let result: Result<Probe, _> = decode(doc);
        assert!(matches!(result, Err(DomainError::Malformed(_))));
    }

    #[test]
    fn test_decode_wrong_type_fails_closed() {
        let doc = serde_json::json!({ "name": "alpha", "count": "three" });
        let result: Result<Probe, _> = decode(doc);
        assert!(matches!(result, Err(DomainError::Malformed(_))));
    }
}
