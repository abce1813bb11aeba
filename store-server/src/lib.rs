//! Store Server - 文具店在线订单、库存和促销服务
//!
//! # 架构概述
//!
//! - **订单** (`orders`): 购物车定价、下单、取件码、状态机
//! - **库存** (`inventory`): 库存台账和低库存/到货提醒
//! - **促销** (`promotions`): 营销活动折扣和优惠券
//! - **通知** (`notify`): 通知事件、投递通道和后台队列
//! - **数据库** (`db`): SQLite (sqlx) 存储
//! - **认证** (`auth`): JWT 验证和角色
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! store-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── auth/          # JWT 认证、角色
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 连接池、迁移、仓储
//! ├── inventory/     # 库存台账
//! ├── notify/        # 通知
//! ├── orders/        # 订单
//! ├── promotions/    # 活动和优惠券
//! └── utils/         # 日志、校验、分页
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod inventory;
pub mod money;
pub mod notify;
pub mod orders;
pub mod promotions;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use crate::core::{Config, Server, ServerState};
pub use orders::{OrderBuilder, OrderService};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
   _____ __
  / ___// /_____  ________
  \__ \/ __/ __ \/ ___/ _ \
 ___/ / /_/ /_/ / /  /  __/
/____/\__/\____/_/   \___/
    "#
    );
}
