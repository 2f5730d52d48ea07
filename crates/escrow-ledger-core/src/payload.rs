//! Decoding of stored event payloads.
//!
//! Records are stored as JSON text. Reads must never fail on a corrupt
//! record: anything that does not parse is kept verbatim in a raw wrapper.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A stored payload after decoding.
///
/// Serializes untagged: `Json` as the value itself, `Raw` as
/// `{"raw": "<original text>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecodedPayload {
    /// Raw text that was not valid JSON.
    Raw { raw: String },
    /// Well-formed JSON.
    Json(serde_json::Value),
}

impl DecodedPayload {
    /// Decode stored text, falling back to the raw wrapper.
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => DecodedPayload::Json(value),
            Err(_) => DecodedPayload::Raw {
                raw: text.to_string(),
            },
        }
    }

    /// Encode a payload for storage.
    pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
        Ok(serde_json::to_string(payload)?)
    }

    /// Whether decoding fell back to the raw wrapper.
    pub fn is_raw(&self) -> bool {
        matches!(self, DecodedPayload::Raw { .. })
    }

    /// The decoded JSON, if any.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            DecodedPayload::Json(value) => Some(value),
            DecodedPayload::Raw { .. } => None,
        }
    }

    /// Convert into a JSON value; the raw wrapper becomes `{"raw": ...}`.
    pub fn into_value(self) -> serde_json::Value {
        match self {
            DecodedPayload::Json(value) => value,
            DecodedPayload::Raw { raw } => serde_json::json!({ "raw": raw }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        let decoded = DecodedPayload::decode(r#"{"escrow_id": 7, "amount": "100"}"#);
        assert!(!decoded.is_raw());
        assert_eq!(decoded.as_json().unwrap()["escrow_id"], 7);
    }

    #[test]
    fn test_decode_malformed_falls_back_to_raw() {
        let decoded = DecodedPayload::decode("{not json");
        assert_eq!(
            decoded,
            DecodedPayload::Raw {
                raw: "{not json".to_string()
            }
        );
        assert_eq!(decoded.into_value(), json!({ "raw": "{not json" }));
    }

    #[test]
    fn test_serialized_shape() {
        let raw = DecodedPayload::decode("oops");
        assert_eq!(serde_json::to_value(&raw).unwrap(), json!({ "raw": "oops" }));

        let parsed = DecodedPayload::decode("[1,2]");
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_encode() {
        let text = DecodedPayload::encode(&json!({ "escrow_id": 3 })).unwrap();
        assert_eq!(text, r#"{"escrow_id":3}"#);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_decode_never_loses_text(text in "\\PC{0,64}") {
                match DecodedPayload::decode(&text) {
                    DecodedPayload::Raw { raw } => prop_assert_eq!(raw, text),
                    DecodedPayload::Json(value) => {
                        let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
                        prop_assert_eq!(value, reparsed);
                    }
                }
            }
        }
    }
}
