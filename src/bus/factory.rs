use std::sync::Arc;
use tracing::info;

use super::{AmqpMessageBus, Envelope, MessageBus, SnsMessageBus};
use crate::clients::amqp_client::{AmqpClientFactory, LapinClientFactory, redact_url};
use crate::clients::sns_client::{AwsCredentials, AwsSnsClientFactory, SnsClientFactory};
use crate::core::config::{AmqpOptions, AwsSnsOptions, BusConfig, DEFAULT_AMQP_URL, MessageBusOptions};
use crate::utils::compression::CompressEngine;
use crate::utils::correlation::CorrelationEngine;

/// Chooses and builds a [`MessageBus`] from [`MessageBusOptions`].
///
/// Construction only captures configuration; no connection is opened until
/// the first publish.
///
/// ```no_run
/// use message_bus::{BusConfig, MessageBusFactory};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BusConfig::from_env()?;
/// let bus = MessageBusFactory::from_config(&config).create(&config.options, None);
/// bus.publish("orders", &serde_json::json!({"id": 1})).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MessageBusFactory {
    sns_clients: Arc<dyn SnsClientFactory>,
    amqp_clients: Arc<dyn AmqpClientFactory>,
    envelope: Envelope,
}

impl Default for MessageBusFactory {
    fn default() -> Self {
        Self {
            sns_clients: Arc::new(AwsSnsClientFactory),
            amqp_clients: Arc::new(LapinClientFactory),
            envelope: Envelope::default(),
        }
    }
}

impl MessageBusFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose buses compress with the engine named in `config`.
    pub fn from_config(config: &BusConfig) -> Self {
        Self::default().with_default_compress_engine(config.default_compress_engine.clone())
    }

    pub fn with_sns_clients(mut self, sns_clients: Arc<dyn SnsClientFactory>) -> Self {
        self.sns_clients = sns_clients;
        self
    }

    pub fn with_amqp_clients(mut self, amqp_clients: Arc<dyn AmqpClientFactory>) -> Self {
        self.amqp_clients = amqp_clients;
        self
    }

    pub fn with_correlation_engine(mut self, correlation: Arc<dyn CorrelationEngine>) -> Self {
        self.envelope = self.envelope.with_correlation(correlation);
        self
    }

    pub fn with_compress_engine(mut self, compression: Arc<dyn CompressEngine>) -> Self {
        self.envelope = self.envelope.with_compression(compression);
        self
    }

    pub fn with_default_compress_engine(mut self, compress_engine: Option<String>) -> Self {
        self.envelope = self.envelope.with_compress_engine(compress_engine);
        self
    }

    /// Development mode selects AMQP; anything else selects SNS with `credentials`.
    pub fn create(
        &self,
        options: &MessageBusOptions,
        credentials: Option<AwsCredentials>,
    ) -> MessageBus {
        if options.development_mode {
            let amqp_options = options.amqp_options.clone().unwrap_or_default();
            return MessageBus::Amqp(self.create_amqp_bus(amqp_options));
        }

        let sns_options = options.aws_sns_options.clone().unwrap_or_default();
        MessageBus::Sns(self.create_aws_sns_bus(sns_options, credentials))
    }

    fn create_amqp_bus(&self, options: AmqpOptions) -> AmqpMessageBus {
        let server_url = options
            .server_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AMQP_URL.to_string());
        info!("Using AMQP message bus at {}", redact_url(&server_url));

        AmqpMessageBus::new(
            server_url,
            options.friendly_names_to_exchange.unwrap_or_default(),
            Arc::clone(&self.amqp_clients),
            self.envelope.clone(),
        )
    }

    fn create_aws_sns_bus(
        &self,
        options: AwsSnsOptions,
        credentials: Option<AwsCredentials>,
    ) -> SnsMessageBus {
        let friendly_names_to_arn = options.friendly_names_to_arn.unwrap_or_default();
        info!(
            "Using AWS SNS message bus with {} topics",
            friendly_names_to_arn.len()
        );

        SnsMessageBus::new(
            friendly_names_to_arn,
            credentials,
            Arc::clone(&self.sns_clients),
            self.envelope.clone(),
        )
    }
}
