//! 服务器状态
//!
//! 持有数据库连接池和各业务服务，所有字段廉价 Clone。

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::config::NotifyMode;
use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result, ServerError};
use crate::db::DbService;
use crate::inventory::StockLedger;
use crate::notify::{
    DirectExecutor, Enqueuer, LogSink, NotificationSink, NotificationWorker, QueueBackedExecutor,
    WebhookSink,
};
use crate::orders::{OrderBuilder, OrderService};
use crate::promotions::CouponValidator;

/// 服务器状态
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 服务器配置 |
/// | pool | SQLite 连接池 |
/// | jwt_service | 令牌签发/验证 |
/// | ledger | 库存流水 |
/// | orders | 订单状态机 |
/// | builder | 购物车定价和下单 |
/// | coupons | 优惠券验证 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub jwt_service: Arc<JwtService>,
    pub ledger: StockLedger,
    pub orders: OrderService,
    pub builder: OrderBuilder,
    pub coupons: CouponValidator,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 创建工作目录
    /// 2. 打开数据库并执行迁移
    /// 3. 选择通知通道 (Webhook 或日志)
    /// 4. 队列模式下启动通知 worker
    pub async fn initialize(config: &Config) -> Result<(Self, BackgroundTasks)> {
        std::fs::create_dir_all(&config.work_dir)?;

        let db = DbService::new(&config.database_path)
            .await
            .map_err(|e| ServerError::Database(e.message))?;
        tracing::info!(path = %config.database_path, "Database ready");

        let sink: Arc<dyn NotificationSink> = match &config.notify_webhook_url {
            Some(url) => Arc::new(
                WebhookSink::new(url.clone())
                    .map_err(|e| ServerError::Config(format!("notification webhook: {e}")))?,
            ),
            None => Arc::new(LogSink),
        };
        tracing::info!(sink = sink.name(), mode = ?config.notify_mode, "Notification channel configured");

        let mut tasks = BackgroundTasks::new();
        let notifier: Arc<dyn Enqueuer> = match config.notify_mode {
            NotifyMode::Direct => Arc::new(DirectExecutor::new(sink)),
            NotifyMode::Queue => {
                let (executor, rx) =
                    QueueBackedExecutor::new(sink.clone(), config.notify_queue_capacity);
                let worker = NotificationWorker::new(sink);
                let token = tasks.shutdown_token();
                tasks.spawn("notification_worker", async move {
                    worker.run(rx, token).await;
                });
                Arc::new(executor)
            }
        };

        Ok((Self::build(config.clone(), db.pool, notifier), tasks))
    }

    /// 使用现有连接池和通知通道构建 (测试用，通知内联投递)
    pub fn with_sink(config: Config, pool: SqlitePool, sink: Arc<dyn NotificationSink>) -> Self {
        Self::build(config, pool, Arc::new(DirectExecutor::new(sink)))
    }

    fn build(config: Config, pool: SqlitePool, notifier: Arc<dyn Enqueuer>) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let ledger = StockLedger::new(pool.clone(), notifier.clone());
        let orders = OrderService::new(
            pool.clone(),
            ledger.clone(),
            notifier,
            config.fulfilment_guard(),
        );
        let builder = OrderBuilder::new(pool.clone());
        let coupons = CouponValidator::new(pool.clone());

        Self {
            config,
            pool,
            jwt_service,
            ledger,
            orders,
            builder,
            coupons,
        }
    }
}
