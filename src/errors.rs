use thiserror::Error;

/// Error type returned by broker clients and client factories.
///
/// SNS and AMQP clients report failures through this one boxed type so the
/// buses never need to know which backend produced them.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum MessageBusError {
    /// The backend could not accept the message (network, auth, rejected
    /// destination, broker nack). Wraps the original client error.
    #[error("Message bus unavailable: {source}")]
    Unavailable {
        #[source]
        source: BoxError,
    },

    #[error("No destination configured for friendly name '{0}'")]
    MissingDestination(String),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MessageBusError {
    /// Wraps a backend client failure; the original error stays available
    /// through [`std::error::Error::source`].
    pub fn unavailable(error: impl Into<BoxError>) -> Self {
        MessageBusError::Unavailable {
            source: error.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, MessageBusError::Unavailable { .. })
    }

    /// The client error behind an `Unavailable` failure.
    pub fn unavailable_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            MessageBusError::Unavailable { source } => Some(&**source),
            _ => None,
        }
    }
}

/// Failure of the compression step. Never returned from `publish`.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("Unknown compress engine: {0}")]
    UnknownEngine(String),

    #[error("Failed to compress message: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode message: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Failed to decode compressed payload: {0}")]
    Decode(#[from] base64::DecodeError),
}
