#![allow(dead_code)]

use async_trait::async_trait;
use message_bus::clients::{
    AmqpClient, AmqpClientFactory, AmqpPublishParams, AwsCredentials, SnsClient,
    SnsClientFactory, SnsPublishOutput, SnsPublishParams,
};
use message_bus::utils::compression::CompressEngine;
use message_bus::utils::correlation::CorrelationEngine;
use message_bus::{BoxError, CompressError, CompressedMessage, WrappedMessage};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const ORDERS_ARN: &str = "arn:aws:sns:us-east-1:123456789012:orders";

#[derive(Default)]
pub struct SnsState {
    pub published: Mutex<Vec<SnsPublishParams>>,
    pub credentials_seen: Mutex<Vec<Option<AwsCredentials>>>,
    pub clients_created: AtomicUsize,
    pub fail_publish: AtomicBool,
    pub fail_create: AtomicBool,
}

/// SNS client factory that records every publish instead of calling AWS.
#[derive(Clone, Default)]
pub struct RecordingSns {
    pub state: Arc<SnsState>,
}

impl RecordingSns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_publish() -> Self {
        let sns = Self::default();
        sns.state.fail_publish.store(true, Ordering::SeqCst);
        sns
    }

    pub fn failing_create() -> Self {
        let sns = Self::default();
        sns.state.fail_create.store(true, Ordering::SeqCst);
        sns
    }

    pub fn published(&self) -> Vec<SnsPublishParams> {
        self.state.published.lock().unwrap().clone()
    }

    pub fn credentials_seen(&self) -> Vec<Option<AwsCredentials>> {
        self.state.credentials_seen.lock().unwrap().clone()
    }

    pub fn clients_created(&self) -> usize {
        self.state.clients_created.load(Ordering::SeqCst)
    }
}

struct RecordingSnsClient {
    state: Arc<SnsState>,
}

#[async_trait]
impl SnsClient for RecordingSnsClient {
    async fn publish(&self, params: SnsPublishParams) -> Result<SnsPublishOutput, BoxError> {
        if self.state.fail_publish.load(Ordering::SeqCst) {
            return Err("connection reset by peer".into());
        }

        let mut published = self.state.published.lock().unwrap();
        published.push(params);
        Ok(SnsPublishOutput {
            message_id: Some(format!("msg-{}", published.len())),
            sequence_number: None,
        })
    }
}

#[async_trait]
impl SnsClientFactory for RecordingSns {
    async fn create(
        &self,
        credentials: Option<&AwsCredentials>,
    ) -> Result<Arc<dyn SnsClient>, BoxError> {
        if self.state.fail_create.load(Ordering::SeqCst) {
            return Err("no credentials available".into());
        }
        self.state.clients_created.fetch_add(1, Ordering::SeqCst);
        self.state
            .credentials_seen
            .lock()
            .unwrap()
            .push(credentials.cloned());

        Ok(Arc::new(RecordingSnsClient {
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Default)]
pub struct AmqpState {
    pub published: Mutex<Vec<AmqpPublishParams>>,
    pub urls: Mutex<Vec<String>>,
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub connected: AtomicBool,
    pub fail_publish: AtomicBool,
    pub fail_connect: AtomicBool,
}

/// AMQP client factory that records connections and publishes in memory.
#[derive(Clone, Default)]
pub struct RecordingAmqp {
    pub state: Arc<AmqpState>,
}

impl RecordingAmqp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<AmqpPublishParams> {
        self.state.published.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.state.urls.lock().unwrap().clone()
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.state.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn drop_connection(&self) {
        self.state.connected.store(false, Ordering::SeqCst);
    }
}

struct RecordingAmqpClient {
    state: Arc<AmqpState>,
}

#[async_trait]
impl AmqpClient for RecordingAmqpClient {
    async fn publish(&self, params: AmqpPublishParams) -> Result<(), BoxError> {
        if self.state.fail_publish.load(Ordering::SeqCst) {
            return Err("channel closed".into());
        }
        self.state.published.lock().unwrap().push(params);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AmqpClientFactory for RecordingAmqp {
    async fn connect(&self, server_url: &str) -> Result<Arc<dyn AmqpClient>, BoxError> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err("connection refused".into());
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.connected.store(true, Ordering::SeqCst);
        self.state.urls.lock().unwrap().push(server_url.to_string());

        Ok(Arc::new(RecordingAmqpClient {
            state: Arc::clone(&self.state),
        }))
    }
}

/// A connection handed out by [`GatedAmqp`]. The first one holds every
/// publish until released, then fails it.
pub struct GatedClient {
    gated: bool,
    connected: AtomicBool,
    closed: AtomicBool,
    published: AtomicUsize,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedClient {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AmqpClient for GatedClient {
    async fn publish(&self, _params: AmqpPublishParams) -> Result<(), BoxError> {
        if self.gated {
            self.entered.notify_one();
            self.release.notified().await;
            return Err("connection reset while publishing".into());
        }
        self.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory whose first client stalls mid-publish until `release` fires.
#[derive(Clone, Default)]
pub struct GatedAmqp {
    clients: Arc<Mutex<Vec<Arc<GatedClient>>>>,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedAmqp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connects(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    pub fn client(&self, index: usize) -> Arc<GatedClient> {
        Arc::clone(&self.clients.lock().unwrap()[index])
    }
}

#[async_trait]
impl AmqpClientFactory for GatedAmqp {
    async fn connect(&self, _server_url: &str) -> Result<Arc<dyn AmqpClient>, BoxError> {
        let mut clients = self.clients.lock().unwrap();
        let client = Arc::new(GatedClient {
            gated: clients.is_empty(),
            connected: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            published: AtomicUsize::new(0),
            entered: Arc::clone(&self.entered),
            release: Arc::clone(&self.release),
        });
        clients.push(Arc::clone(&client));
        Ok(client as Arc<dyn AmqpClient>)
    }
}

/// Always wraps with the same correlation id.
pub struct FixedCorrelation(pub &'static str);

impl CorrelationEngine for FixedCorrelation {
    fn wrap(&self, message: &Value) -> WrappedMessage {
        WrappedMessage {
            correlation_id: self.0.to_string(),
            payload: message.clone(),
        }
    }
}

/// Compressor that always fails, counting its calls.
#[derive(Default)]
pub struct BrokenCompressor {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CompressEngine for BrokenCompressor {
    async fn compress(
        &self,
        _message: &WrappedMessage,
        engine: &str,
    ) -> Result<CompressedMessage, CompressError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompressError::UnknownEngine(engine.to_string()))
    }
}
