//! AMQP client seam backed by lapin.
//!
//! Messages go to durable fanout exchanges named after the destination, with
//! publisher confirms enabled on the channel. Each exchange is declared once
//! per connection.

use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind, options::*,
    types::FieldTable,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::BoxError;

const CONTENT_TYPE_JSON: &str = "application/json";
const DELIVERY_MODE_PERSISTENT: u8 = 2;
const REPLY_SUCCESS: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmqpPublishParams {
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub correlation_id: String,
    pub message_id: String,
}

#[async_trait]
pub trait AmqpClient: Send + Sync {
    async fn publish(&self, params: AmqpPublishParams) -> Result<(), BoxError>;

    /// Whether the client can still be reused for the next publish.
    fn is_connected(&self) -> bool;

    /// Releases the broker connection. Called once the bus stops using the client.
    async fn close(&self);
}

#[async_trait]
pub trait AmqpClientFactory: Send + Sync {
    async fn connect(&self, server_url: &str) -> Result<Arc<dyn AmqpClient>, BoxError>;
}

/// Exchange names already declared on one connection.
#[derive(Debug, Default)]
pub struct DeclaredExchanges {
    names: Mutex<HashSet<String>>,
}

impl DeclaredExchanges {
    pub fn contains(&self, exchange: &str) -> bool {
        self.names
            .lock()
            .map(|names| names.contains(exchange))
            .unwrap_or(false)
    }

    pub fn insert(&self, exchange: &str) {
        if let Ok(mut names) = self.names.lock() {
            names.insert(exchange.to_string());
        }
    }
}

pub struct LapinClient {
    connection: Connection,
    channel: Channel,
    declared: DeclaredExchanges,
}

impl LapinClient {
    async fn declare_exchange(&self, exchange: &str) -> Result<(), BoxError> {
        if self.declared.contains(exchange) {
            return Ok(());
        }

        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.declared.insert(exchange);
        Ok(())
    }
}

#[async_trait]
impl AmqpClient for LapinClient {
    async fn publish(&self, params: AmqpPublishParams) -> Result<(), BoxError> {
        self.declare_exchange(&params.exchange).await?;

        let properties = BasicProperties::default()
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
            .with_content_type(CONTENT_TYPE_JSON.into())
            .with_correlation_id(params.correlation_id.clone().into())
            .with_message_id(params.message_id.clone().into())
            .with_timestamp(chrono::Utc::now().timestamp() as u64);

        let confirmation = self
            .channel
            .basic_publish(
                &params.exchange,
                &params.routing_key,
                BasicPublishOptions::default(),
                &params.body,
                properties,
            )
            .await?
            .await?;

        if confirmation.is_nack() {
            return Err(format!("broker rejected message {}", params.message_id).into());
        }

        debug!(
            exchange = %params.exchange,
            message_id = %params.message_id,
            "Published message to AMQP exchange"
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn close(&self) {
        if let Err(e) = self.connection.close(REPLY_SUCCESS, "reconnecting").await {
            warn!("Failed to close AMQP connection: {}", e);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LapinClientFactory;

#[async_trait]
impl AmqpClientFactory for LapinClientFactory {
    async fn connect(&self, server_url: &str) -> Result<Arc<dyn AmqpClient>, BoxError> {
        let connection = Connection::connect(server_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        info!("Connected to AMQP broker at {}", redact_url(server_url));

        Ok(Arc::new(LapinClient {
            connection,
            channel,
            declared: DeclaredExchanges::default(),
        }))
    }
}

/// Strips the password from a broker URL so it can be logged.
pub fn redact_url(server_url: &str) -> String {
    match Url::parse(server_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => server_url.to_string(),
    }
}
