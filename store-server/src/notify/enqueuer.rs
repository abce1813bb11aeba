//! 通知投递策略
//!
//! - [`DirectExecutor`] - 调用方内联等待投递完成
//! - [`QueueBackedExecutor`] - 写入 mpsc 队列，由 [`super::NotificationWorker`] 消费；
//!   队列满或已关闭时退化为内联投递

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{NotificationEvent, NotificationSink};

#[async_trait]
pub trait Enqueuer: Send + Sync {
    /// Never fails: delivery errors are logged
    async fn enqueue(&self, event: NotificationEvent);
}

pub(crate) async fn deliver_logged(sink: &dyn NotificationSink, event: &NotificationEvent) {
    if let Err(e) = sink.deliver(event).await {
        tracing::warn!(sink = sink.name(), kind = event.kind(), error = %e, "Notification delivery failed");
    }
}

/// Inline delivery
#[derive(Clone)]
pub struct DirectExecutor {
    sink: Arc<dyn NotificationSink>,
}

impl DirectExecutor {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Enqueuer for DirectExecutor {
    async fn enqueue(&self, event: NotificationEvent) {
        deliver_logged(self.sink.as_ref(), &event).await;
    }
}

/// Queue-backed delivery
#[derive(Clone)]
pub struct QueueBackedExecutor {
    tx: mpsc::Sender<NotificationEvent>,
    fallback: Arc<dyn NotificationSink>,
}

impl QueueBackedExecutor {
    /// Returns the executor and the receiving end for the worker
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, fallback: sink }, rx)
    }
}

#[async_trait]
impl Enqueuer for QueueBackedExecutor {
    async fn enqueue(&self, event: NotificationEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(kind = event.kind(), "Notification queue full, delivering inline");
                deliver_logged(self.fallback.as_ref(), &event).await;
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(kind = event.kind(), "Notification queue closed, delivering inline");
                deliver_logged(self.fallback.as_ref(), &event).await;
            }
        }
    }
}
