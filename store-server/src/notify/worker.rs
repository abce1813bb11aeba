//! 通知后台 Worker
//!
//! 从 mpsc 通道消费 NotificationEvent 并投递到 sink。
//! 收到 shutdown 信号后排空队列再退出。

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::enqueuer::deliver_logged;
use super::{NotificationEvent, NotificationSink};

pub struct NotificationWorker {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationWorker {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// 运行 worker（直到通道关闭或收到 shutdown）
    pub async fn run(self, mut rx: mpsc::Receiver<NotificationEvent>, shutdown: CancellationToken) {
        tracing::info!(sink = self.sink.name(), "Notification worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => deliver_logged(self.sink.as_ref(), &event).await,
                    None => {
                        tracing::info!("Notification channel closed, worker stopping");
                        return;
                    }
                },
            }
        }

        // 排空剩余事件
        rx.close();
        let mut drained = 0usize;
        while let Some(event) = rx.recv().await {
            deliver_logged(self.sink.as_ref(), &event).await;
            drained += 1;
        }
        tracing::info!(drained, "Notification worker stopped");
    }
}
