use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::{BusKind, Envelope};
use crate::clients::amqp_client::{AmqpClient, AmqpClientFactory, AmqpPublishParams, redact_url};
use crate::core::models::PublishReceipt;
use crate::errors::MessageBusError;

/// Publishes to AMQP fanout exchanges, typically a local RabbitMQ in
/// development mode.
///
/// The connection is opened on the first publish and shared by every clone of
/// the bus until it drops or a send on it fails; the replaced connection is
/// closed.
#[derive(Clone)]
pub struct AmqpMessageBus {
    server_url: String,
    friendly_names_to_exchange: Arc<HashMap<String, String>>,
    clients: Arc<dyn AmqpClientFactory>,
    client: Arc<Mutex<Option<Arc<dyn AmqpClient>>>>,
    envelope: Envelope,
}

impl AmqpMessageBus {
    pub fn new(
        server_url: impl Into<String>,
        friendly_names_to_exchange: HashMap<String, String>,
        clients: Arc<dyn AmqpClientFactory>,
        envelope: Envelope,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            friendly_names_to_exchange: Arc::new(friendly_names_to_exchange),
            clients,
            client: Arc::new(Mutex::new(None)),
            envelope,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn friendly_names_to_exchange(&self) -> &HashMap<String, String> {
        &self.friendly_names_to_exchange
    }

    pub fn compress_engine(&self) -> Option<&str> {
        self.envelope.compress_engine()
    }

    /// Exchange for `friendly_name`; unmapped names are used as-is.
    pub fn exchange(&self, friendly_name: &str) -> String {
        self.friendly_names_to_exchange
            .get(friendly_name)
            .cloned()
            .unwrap_or_else(|| friendly_name.to_string())
    }

    pub(crate) async fn publish_value(
        &self,
        friendly_name: &str,
        message: &Value,
    ) -> Result<PublishReceipt, MessageBusError> {
        let span = info_span!("message-bus:send", backend = %BusKind::Amqp, destination = %friendly_name);
        self.send(friendly_name, message).instrument(span).await
    }

    async fn send(
        &self,
        friendly_name: &str,
        message: &Value,
    ) -> Result<PublishReceipt, MessageBusError> {
        let exchange = self.exchange(friendly_name);
        let (correlation_id, payload) = self.envelope.seal(message).await;
        let body = payload.to_body()?;
        let message_id = Uuid::new_v4().to_string();

        let client = self.client().await?;

        info!(exchange = %exchange, correlation_id = %correlation_id, "Sending message to AMQP");

        let result = client
            .publish(AmqpPublishParams {
                exchange: exchange.clone(),
                routing_key: String::new(),
                body: body.into_bytes(),
                correlation_id: correlation_id.clone(),
                message_id: message_id.clone(),
            })
            .await;

        if let Err(e) = result {
            error!(exchange = %exchange, "Failed to publish message to AMQP: {}", e);
            self.evict(&client).await;
            return Err(MessageBusError::unavailable(e));
        }

        Ok(PublishReceipt {
            backend: BusKind::Amqp,
            destination: exchange,
            correlation_id,
            message_id: Some(message_id),
            compressed: payload.is_compressed(),
        })
    }

    async fn client(&self) -> Result<Arc<dyn AmqpClient>, MessageBusError> {
        let mut slot = self.client.lock().await;

        if let Some(client) = slot.as_ref().filter(|client| client.is_connected()) {
            return Ok(Arc::clone(client));
        }

        if let Some(stale) = slot.take() {
            warn!("AMQP connection lost, reconnecting");
            stale.close().await;
        }

        let client = self.clients.connect(&self.server_url).await.map_err(|e| {
            error!(
                "Failed to connect to AMQP broker at {}: {}",
                redact_url(&self.server_url),
                e
            );
            MessageBusError::unavailable(e)
        })?;

        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Drops `failed` from the shared slot and closes it. A newer client put
    /// there by a concurrent publish is left alone.
    async fn evict(&self, failed: &Arc<dyn AmqpClient>) {
        let evicted = {
            let mut slot = self.client.lock().await;
            let is_current = slot
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, failed));
            if is_current { slot.take() } else { None }
        };

        if let Some(client) = evicted {
            client.close().await;
        }
    }
}

impl fmt::Debug for AmqpMessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmqpMessageBus")
            .field("server_url", &redact_url(&self.server_url))
            .field("friendly_names_to_exchange", &self.friendly_names_to_exchange)
            .field("envelope", &self.envelope)
            .finish_non_exhaustive()
    }
}
