use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bus::BusKind;

/// A caller message plus the correlation id used to trace it across services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedMessage {
    pub correlation_id: String,
    pub payload: Value,
}

/// A wrapped message compressed by a named engine, base64 encoded so it can
/// travel inside a JSON string body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedMessage {
    pub compress_engine: String,
    pub payload: String,
}

/// What actually goes on the wire: compressed when the engine succeeded,
/// otherwise the wrapped message itself.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingPayload {
    Compressed(CompressedMessage),
    Uncompressed(WrappedMessage),
}

impl OutgoingPayload {
    pub fn is_compressed(&self) -> bool {
        matches!(self, OutgoingPayload::Compressed(_))
    }

    /// JSON body sent to the broker.
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        match self {
            OutgoingPayload::Compressed(message) => serde_json::to_string(message),
            OutgoingPayload::Uncompressed(message) => serde_json::to_string(message),
        }
    }
}

/// Acknowledgement returned by a successful publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    pub backend: BusKind,
    /// Resolved backend address (topic ARN or exchange name).
    pub destination: String,
    pub correlation_id: String,
    pub message_id: Option<String>,
    pub compressed: bool,
}
