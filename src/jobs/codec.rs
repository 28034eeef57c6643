//! Payload codecs
//!
//! Trigger stores only persist strings, so every payload type needs a way in
//! and out of one.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Turns a payload into the string a trigger store persists
pub trait JobPayloadSerializer<T>: Send + Sync {
    fn serialize(&self, payload: &T) -> anyhow::Result<String>;
}

/// Rebuilds a payload from its persisted string
pub trait JobPayloadDeserializer<T>: Send + Sync {
    fn deserialize(&self, raw: &str) -> anyhow::Result<T>;
}

/// JSON codec for any serde payload
pub struct JsonPayloadCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonPayloadCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonPayloadCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> JobPayloadSerializer<T> for JsonPayloadCodec<T> {
    fn serialize(&self, payload: &T) -> anyhow::Result<String> {
        Ok(serde_json::to_string(payload)?)
    }
}

impl<T: DeserializeOwned> JobPayloadDeserializer<T> for JsonPayloadCodec<T> {
    fn deserialize(&self, raw: &str) -> anyhow::Result<T> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Identity codec for payloads that already are strings
#[derive(Debug, Default, Clone, Copy)]
pub struct StringPayloadCodec;

impl JobPayloadSerializer<String> for StringPayloadCodec {
    fn serialize(&self, payload: &String) -> anyhow::Result<String> {
        Ok(payload.clone())
    }
}

impl JobPayloadDeserializer<String> for StringPayloadCodec {
    fn deserialize(&self, raw: &str) -> anyhow::Result<String> {
        Ok(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reminder {
        case_id: u64,
        reason: String,
        recipients: Vec<String>,
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        let codec = JsonPayloadCodec::<Reminder>::new();
        assert!(codec.deserialize("{not json").is_err());
        assert!(codec.deserialize("{\"case_id\": 1}").is_err());
    }

    #[test]
    fn test_string_codec_is_identity() {
        let codec = StringPayloadCodec;
        let raw = codec.serialize(&"1234,hearing,cancelled".to_string()).unwrap();
        assert_eq!(raw, "1234,hearing,cancelled");
        assert_eq!(codec.deserialize(&raw).unwrap(), "1234,hearing,cancelled");
    }

    proptest! {
        /// Whatever goes through the JSON codec comes back value-equal.
        #[test]
        fn prop_json_codec_is_lossless(
            case_id in any::<u64>(),
            reason in ".{0,40}",
            recipients in proptest::collection::vec("[a-z@.]{1,20}", 0..4),
        ) {
            let codec = JsonPayloadCodec::<Reminder>::new();
            let payload = Reminder { case_id, reason, recipients };
            let raw = codec.serialize(&payload).unwrap();
            prop_assert_eq!(codec.deserialize(&raw).unwrap(), payload);
        }
    }
}
