use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};

use super::{BusKind, Envelope};
use crate::clients::sns_client::{AwsCredentials, SnsClientFactory, SnsPublishParams};
use crate::core::models::PublishReceipt;
use crate::errors::MessageBusError;

/// Publishes to AWS SNS topics addressed by friendly name.
#[derive(Clone)]
pub struct SnsMessageBus {
    friendly_names_to_arn: Arc<HashMap<String, String>>,
    credentials: Option<AwsCredentials>,
    clients: Arc<dyn SnsClientFactory>,
    envelope: Envelope,
}

impl SnsMessageBus {
    pub fn new(
        friendly_names_to_arn: HashMap<String, String>,
        credentials: Option<AwsCredentials>,
        clients: Arc<dyn SnsClientFactory>,
        envelope: Envelope,
    ) -> Self {
        Self {
            friendly_names_to_arn: Arc::new(friendly_names_to_arn),
            credentials,
            clients,
            envelope,
        }
    }

    pub fn friendly_names_to_arn(&self) -> &HashMap<String, String> {
        &self.friendly_names_to_arn
    }

    pub fn credentials(&self) -> Option<&AwsCredentials> {
        self.credentials.as_ref()
    }

    pub fn compress_engine(&self) -> Option<&str> {
        self.envelope.compress_engine()
    }

    pub fn topic_arn(&self, friendly_name: &str) -> Result<&str, MessageBusError> {
        self.friendly_names_to_arn
            .get(friendly_name)
            .map(String::as_str)
            .ok_or_else(|| MessageBusError::MissingDestination(friendly_name.to_string()))
    }

    pub(crate) async fn publish_value(
        &self,
        friendly_name: &str,
        message: &Value,
    ) -> Result<PublishReceipt, MessageBusError> {
        let span = info_span!("message-bus:send", backend = %BusKind::Sns, destination = %friendly_name);
        self.send(friendly_name, message).instrument(span).await
    }

    async fn send(
        &self,
        friendly_name: &str,
        message: &Value,
    ) -> Result<PublishReceipt, MessageBusError> {
        let topic_arn = self.topic_arn(friendly_name)?.to_string();
        let (correlation_id, payload) = self.envelope.seal(message).await;
        let body = payload.to_body()?;

        let client = self
            .clients
            .create(self.credentials.as_ref())
            .await
            .map_err(|e| {
                error!("Failed to create SNS client: {}", e);
                MessageBusError::unavailable(e)
            })?;

        info!(topic_arn = %topic_arn, correlation_id = %correlation_id, "Sending message to SNS");

        let output = client
            .publish(SnsPublishParams {
                message: body,
                topic_arn: topic_arn.clone(),
            })
            .await
            .map_err(|e| {
                error!(topic_arn = %topic_arn, "Failed to publish message to SNS: {}", e);
                MessageBusError::unavailable(e)
            })?;

        Ok(PublishReceipt {
            backend: BusKind::Sns,
            destination: topic_arn,
            correlation_id,
            message_id: output.message_id,
            compressed: payload.is_compressed(),
        })
    }
}

impl fmt::Debug for SnsMessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnsMessageBus")
            .field("friendly_names_to_arn", &self.friendly_names_to_arn)
            .field("credentials", &self.credentials)
            .field("envelope", &self.envelope)
            .finish_non_exhaustive()
    }
}
