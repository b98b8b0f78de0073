//! AWS SNS client seam.
//!
//! The bus asks a [`SnsClientFactory`] for a fresh client on every publish, so
//! credentials are always applied as configured.

use async_trait::async_trait;
use aws_sdk_sns::Client as AwsSdkSnsClient;
use aws_sdk_sns::config::{Credentials, Region};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::errors::BoxError;

const CREDENTIALS_PROVIDER_NAME: &str = "message-bus";

/// Optional overrides for the default AWS credential/region chain.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsCredentials {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint, e.g. a localstack URL.
    pub endpoint_url: Option<String>,
}

// Keys stay out of logs.
impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// Parameters of a single SNS publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnsPublishParams {
    pub message: String,
    pub topic_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnsPublishOutput {
    pub message_id: Option<String>,
    pub sequence_number: Option<String>,
}

#[async_trait]
pub trait SnsClient: Send + Sync {
    async fn publish(&self, params: SnsPublishParams) -> Result<SnsPublishOutput, BoxError>;
}

#[async_trait]
pub trait SnsClientFactory: Send + Sync {
    async fn create(
        &self,
        credentials: Option<&AwsCredentials>,
    ) -> Result<Arc<dyn SnsClient>, BoxError>;
}

pub struct AwsSnsClient {
    inner: AwsSdkSnsClient,
}

impl AwsSnsClient {
    pub fn new(inner: AwsSdkSnsClient) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SnsClient for AwsSnsClient {
    async fn publish(&self, params: SnsPublishParams) -> Result<SnsPublishOutput, BoxError> {
        let output = self
            .inner
            .publish()
            .topic_arn(params.topic_arn)
            .message(params.message)
            .send()
            .await?;

        Ok(SnsPublishOutput {
            message_id: output.message_id().map(str::to_string),
            sequence_number: output.sequence_number().map(str::to_string),
        })
    }
}

/// Builds `aws-sdk-sns` clients from the environment's AWS config, with any
/// supplied [`AwsCredentials`] layered on top.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsSnsClientFactory;

#[async_trait]
impl SnsClientFactory for AwsSnsClientFactory {
    async fn create(
        &self,
        credentials: Option<&AwsCredentials>,
    ) -> Result<Arc<dyn SnsClient>, BoxError> {
        let mut loader = aws_config::from_env();

        if let Some(creds) = credentials {
            if let Some(region) = &creds.region {
                loader = loader.region(Region::new(region.clone()));
            }
            if let Some(endpoint_url) = &creds.endpoint_url {
                loader = loader.endpoint_url(endpoint_url.clone());
            }
            match (&creds.access_key_id, &creds.secret_access_key) {
                (Some(access_key_id), Some(secret_access_key)) => {
                    loader = loader.credentials_provider(Credentials::new(
                        access_key_id.clone(),
                        secret_access_key.clone(),
                        creds.session_token.clone(),
                        None,
                        CREDENTIALS_PROVIDER_NAME,
                    ));
                }
                (None, None) => {}
                _ => {
                    return Err(
                        "accessKeyId and secretAccessKey must be provided together".into(),
                    );
                }
            }
        }

        let shared_config = loader.load().await;
        debug!(region = ?shared_config.region(), "Created SNS client");

        Ok(Arc::new(AwsSnsClient::new(AwsSdkSnsClient::new(
            &shared_config,
        ))))
    }
}
