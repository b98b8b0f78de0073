/// Message bus - publish application messages to AWS SNS or an AMQP broker.
///
/// A [`MessageBusFactory`] picks the backend once, from configuration:
/// 1. Development mode publishes to an AMQP broker (a local RabbitMQ by default)
/// 2. Otherwise messages go to AWS SNS topics addressed by friendly name
///
/// # Publishing
///
/// Every publish wraps the message with a correlation id, compresses it when a
/// compression engine is configured (falling back to the uncompressed message
/// if that fails), and sends the JSON body through the backend client. Backend
/// failures come back as [`MessageBusError::Unavailable`].
///
/// The system uses:
/// - `aws-sdk-sns` for SNS topics
/// - `lapin` for AMQP exchanges
/// - `flate2` for gzip/deflate payload compression
/// - Tokio for async runtime
///
/// # Example
///
/// ```no_run
/// use message_bus::{AwsCredentials, MessageBusFactory, MessageBusOptions};
/// use std::collections::HashMap;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     message_bus::setup_logging();
///
///     let options = MessageBusOptions::from_json(
///         r#"{"awsSnsOptions": {"friendlyNamesToArn": {
///             "orders": "arn:aws:sns:us-east-1:123456789012:orders"
///         }}}"#,
///     )?;
///     let credentials = AwsCredentials {
///         region: Some("us-east-1".to_string()),
///         ..Default::default()
///     };
///
///     let bus = MessageBusFactory::new().create(&options, Some(credentials));
///
///     let mut order = HashMap::new();
///     order.insert("id", 1);
///     let receipt = bus.publish("orders", &order).await?;
///     println!("Published {:?} to {}", receipt.message_id, receipt.destination);
///
///     Ok(())
/// }
/// ```
pub mod bus;
pub mod clients;
pub mod core;
pub mod errors;
pub mod utils;

pub use bus::{AmqpMessageBus, BusKind, MessageBus, MessageBusFactory, SnsMessageBus};
pub use clients::AwsCredentials;
pub use crate::core::config::{AmqpOptions, AwsSnsOptions, BusConfig, DEFAULT_AMQP_URL, MessageBusOptions};
pub use crate::core::models::{CompressedMessage, OutgoingPayload, PublishReceipt, WrappedMessage};
pub use errors::{BoxError, CompressError, MessageBusError};
pub use utils::correlation::{current_correlation_id, with_correlation_id};

/// Configure structured logging with JSON format.
///
/// Installs a tracing-subscriber JSON formatter suitable for `CloudWatch` Logs
/// integration, filtered by `RUST_LOG` (default `info`). Calling it more than
/// once is harmless; only the first call installs a subscriber.
///
/// # Example
///
/// ```
/// message_bus::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
