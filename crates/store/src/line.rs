//! Log line wire type

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use streamline_engine::EngineEntry;

/// One log line: opaque content plus the engine-assigned sequence.
///
/// `sequence` is populated from the stored entry on read and ignored on
/// write; ordering within a stream is established by the engine, not the
/// writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Opaque payload bytes
    pub content: Vec<u8>,

    /// Engine-assigned sequence; 0 until the line has been stored
    #[serde(default)]
    pub sequence: u64,
}

impl Line {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            sequence: 0,
        }
    }

    /// Encode for storage.
    pub(crate) fn encode(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a stored entry, taking the sequence from the entry itself.
    ///
    /// Fails on malformed payloads, including the empty sentinel entry a
    /// stream is materialized with; callers skip such entries.
    pub(crate) fn decode(key: &str, entry: &EngineEntry) -> crate::Result<Self> {
        let mut line: Line =
            serde_json::from_slice(&entry.payload).map_err(|source| StoreError::Decode {
                key: key.to_string(),
                sequence: entry.sequence,
                source,
            })?;
        line.sequence = entry.sequence;
        Ok(line)
    }
}

impl From<&str> for Line {
    fn from(content: &str) -> Self {
        Line::new(content.as_bytes().to_vec())
    }
}

impl From<String> for Line {
    fn from(content: String) -> Self {
        Line::new(content.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_takes_sequence_from_entry() {
        let line = Line::new(b"hello".to_vec());
        let entry = EngineEntry::new(42, line.encode().unwrap());
        let decoded = Line::decode("k", &entry).unwrap();
        assert_eq!(decoded.content, b"hello");
        assert_eq!(decoded.sequence, 42);
    }

    #[test]
    fn sentinel_entry_fails_decode() {
        let entry = EngineEntry::new(1, Vec::new());
        assert!(matches!(
            Line::decode("k", &entry),
            Err(StoreError::Decode { sequence: 1, .. })
        ));
    }

    #[test]
    fn garbage_payload_fails_decode() {
        let entry = EngineEntry::new(7, b"not json".to_vec());
        assert!(Line::decode("k", &entry).is_err());
    }
}
