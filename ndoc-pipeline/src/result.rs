//! Decoded output and its JSON envelope.

use serde::{Deserialize, Serialize};

/// The decoded payload: every byte the decoder emitted, in order.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SerializedResult {
    bytes: Vec<u8>,
}

impl SerializedResult {
    /// Wrap decoded bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The decoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Take the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Render as `{"serializedData":[...]}`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&SerializedEnvelope {
            serialized_data: self.bytes.clone(),
        })
    }
}

impl AsRef<[u8]> for SerializedResult {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Wire shape shared with the conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEnvelope {
    /// Decoded bytes as a JSON array of numbers.
    #[serde(rename = "serializedData")]
    pub serialized_data: Vec<u8>,
}

impl From<SerializedResult> for SerializedEnvelope {
    fn from(result: SerializedResult) -> Self {
        Self {
            serialized_data: result.bytes,
        }
    }
}

impl From<SerializedEnvelope> for SerializedResult {
    fn from(envelope: SerializedEnvelope) -> Self {
        Self::new(envelope.serialized_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let result = SerializedResult::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(result.to_json().unwrap(), r#"{"serializedData":[1,2,3,4,5]}"#);
        assert_eq!(
            SerializedResult::default().to_json().unwrap(),
            r#"{"serializedData":[]}"#
        );
    }

    #[test]
    fn test_envelope_parse() {
        let envelope: SerializedEnvelope =
            serde_json::from_str(r#"{"serializedData":[0,255,16]}"#).unwrap();
        let result = SerializedResult::from(envelope);
        assert_eq!(result.as_bytes(), &[0, 255, 16]);

        assert!(serde_json::from_str::<SerializedEnvelope>(r#"{"serializedData":[256]}"#).is_err());
        assert!(serde_json::from_str::<SerializedEnvelope>(r#"{"data":[1]}"#).is_err());
    }
}
