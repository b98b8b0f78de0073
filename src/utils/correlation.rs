//! Correlation id wrapping for outbound messages.

use serde_json::Value;
use std::future::Future;
use uuid::Uuid;

use crate::core::models::WrappedMessage;

tokio::task_local! {
    static CORRELATION_ID: String;
}

/// Wraps an outbound message with correlation metadata. Must not fail.
pub trait CorrelationEngine: Send + Sync {
    fn wrap(&self, message: &Value) -> WrappedMessage;
}

/// Reuses the correlation id of the current task scope, or mints a UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCorrelationEngine;

impl CorrelationEngine for UuidCorrelationEngine {
    fn wrap(&self, message: &Value) -> WrappedMessage {
        let correlation_id =
            current_correlation_id().unwrap_or_else(|| Uuid::new_v4().to_string());

        WrappedMessage {
            correlation_id,
            payload: message.clone(),
        }
    }
}

/// Runs `future` with `id` as the correlation id for every message published inside it.
pub async fn with_correlation_id<F>(id: impl Into<String>, future: F) -> F::Output
where
    F: Future,
{
    CORRELATION_ID.scope(id.into(), future).await
}

pub fn current_correlation_id() -> Option<String> {
    CORRELATION_ID.try_with(Clone::clone).ok()
}
