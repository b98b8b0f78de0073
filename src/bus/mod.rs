//! Message buses and the factory that picks one.
//!
//! Every bus runs the same pipeline: wrap the message with a correlation id,
//! compress it when an engine is configured (best effort), resolve the
//! friendly name, then hand the JSON body to the backend client. Send
//! failures surface as [`MessageBusError::Unavailable`].

pub mod amqp;
pub mod factory;
pub mod sns;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::core::models::{OutgoingPayload, PublishReceipt, WrappedMessage};
use crate::errors::MessageBusError;
use crate::utils::compression::{CompressEngine, DefaultCompressEngine, compress_or_fallback};
use crate::utils::correlation::{CorrelationEngine, UuidCorrelationEngine};

pub use amqp::AmqpMessageBus;
pub use factory::MessageBusFactory;
pub use sns::SnsMessageBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusKind {
    Sns,
    Amqp,
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusKind::Sns => write!(f, "sns"),
            BusKind::Amqp => write!(f, "amqp"),
        }
    }
}

/// A bus selected once by [`MessageBusFactory`].
#[derive(Clone)]
pub enum MessageBus {
    Sns(SnsMessageBus),
    Amqp(AmqpMessageBus),
}

impl MessageBus {
    pub fn kind(&self) -> BusKind {
        match self {
            MessageBus::Sns(_) => BusKind::Sns,
            MessageBus::Amqp(_) => BusKind::Amqp,
        }
    }

    pub fn as_sns(&self) -> Option<&SnsMessageBus> {
        match self {
            MessageBus::Sns(bus) => Some(bus),
            MessageBus::Amqp(_) => None,
        }
    }

    pub fn as_amqp(&self) -> Option<&AmqpMessageBus> {
        match self {
            MessageBus::Amqp(bus) => Some(bus),
            MessageBus::Sns(_) => None,
        }
    }

    /// Publishes `message` to the destination registered as `friendly_name`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the message cannot be represented as JSON,
    /// `MissingDestination` if the SNS bus has no topic for the name, and
    /// `Unavailable` if the backend could not be reached or refused the message.
    /// Compression failures are logged and never returned.
    pub async fn publish<M>(
        &self,
        friendly_name: &str,
        message: &M,
    ) -> Result<PublishReceipt, MessageBusError>
    where
        M: Serialize + ?Sized,
    {
        let value = serde_json::to_value(message)?;
        match self {
            MessageBus::Sns(bus) => bus.publish_value(friendly_name, &value).await,
            MessageBus::Amqp(bus) => bus.publish_value(friendly_name, &value).await,
        }
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageBus::Sns(bus) => f.debug_tuple("Sns").field(bus).finish(),
            MessageBus::Amqp(bus) => f.debug_tuple("Amqp").field(bus).finish(),
        }
    }
}

/// Correlation and compression shared by every bus.
#[derive(Clone)]
pub struct Envelope {
    correlation: Arc<dyn CorrelationEngine>,
    compression: Arc<dyn CompressEngine>,
    compress_engine: Option<String>,
}

impl Envelope {
    pub fn new(
        correlation: Arc<dyn CorrelationEngine>,
        compression: Arc<dyn CompressEngine>,
        compress_engine: Option<String>,
    ) -> Self {
        Self {
            correlation,
            compression,
            compress_engine,
        }
    }

    pub fn compress_engine(&self) -> Option<&str> {
        self.compress_engine.as_deref()
    }

    pub fn with_correlation(mut self, correlation: Arc<dyn CorrelationEngine>) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn with_compression(mut self, compression: Arc<dyn CompressEngine>) -> Self {
        self.compression = compression;
        self
    }

    /// Same collaborators, different engine name.
    pub fn with_compress_engine(mut self, compress_engine: Option<String>) -> Self {
        self.compress_engine = compress_engine;
        self
    }

    pub(crate) async fn seal(&self, message: &serde_json::Value) -> (String, OutgoingPayload) {
        let wrapped = self.correlation.wrap(message);
        log_wrapped(&wrapped);

        let correlation_id = wrapped.correlation_id.clone();
        let payload =
            compress_or_fallback(self.compression.as_ref(), wrapped, self.compress_engine()).await;
        (correlation_id, payload)
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(
            Arc::new(UuidCorrelationEngine),
            Arc::new(DefaultCompressEngine),
            None,
        )
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("compress_engine", &self.compress_engine)
            .finish_non_exhaustive()
    }
}

fn log_wrapped(wrapped: &WrappedMessage) {
    #[cfg(feature = "debug-logs")]
    info!(
        correlation_id = %wrapped.correlation_id,
        "Sending message\nWrapped message {}",
        serde_json::to_string(wrapped).unwrap_or_default()
    );

    #[cfg(not(feature = "debug-logs"))]
    info!(
        correlation_id = %wrapped.correlation_id,
        "Sending message [... payload masked, enable debug-logs feature to view it ...]"
    );
}
