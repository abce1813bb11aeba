//! Notification sinks

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{NotificationEvent, NotifyError};

/// 通知出口
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError>;

    fn name(&self) -> &'static str;
}

/// Writes events to the log only
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event)?;
        tracing::info!(target: "notify", kind = event.kind(), payload = %payload, "Notification");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// POSTs events as JSON to a messaging gateway
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.url).json(event).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        tracing::debug!(kind = event.kind(), url = %self.url, "Webhook notification delivered");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Collects events in memory (tests, local tooling)
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
