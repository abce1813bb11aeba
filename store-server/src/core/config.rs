use crate::auth::JwtConfig;
use crate::inventory::StockGuard;

/// 通知投递模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    /// 内联投递
    Direct,
    /// 后台队列投递
    Queue,
}

impl NotifyMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "queue" => Some(Self::Queue),
            _ => None,
        }
    }
}

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 |
/// | DATABASE_PATH | {WORK_DIR}/store.db | SQLite 数据库文件 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | (无) | 按天滚动的日志目录 |
/// | NOTIFY_MODE | queue | 通知投递: queue / direct |
/// | NOTIFY_WEBHOOK_URL | (无) | 消息网关地址，未设置时只写日志 |
/// | NOTIFY_QUEUE_CAPACITY | 1024 | 通知队列容量 |
/// | ALLOW_NEGATIVE_STOCK | false | 备货时允许负库存 |
/// | MAX_CONNECTIONS | 1000 | 最大并发请求数 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | JWT_SECRET / JWT_ISSUER / JWT_AUDIENCE | - | 令牌验证 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/store HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// SQLite 数据库路径
    pub database_path: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub notify_mode: NotifyMode,
    pub notify_webhook_url: Option<String>,
    pub notify_queue_capacity: usize,
    /// 备货扣库存时是否允许负数
    pub allow_negative_stock: bool,
    /// 最大并发请求数
    pub max_connections: usize,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = env_non_empty("WORK_DIR").unwrap_or_else(|| "./data".into());
        let database_path =
            env_non_empty("DATABASE_PATH").unwrap_or_else(|| format!("{work_dir}/store.db"));

        Self {
            database_path,
            work_dir,
            http_port: env_parse("HTTP_PORT").unwrap_or(3000),
            jwt: JwtConfig::from_env(),
            environment: env_non_empty("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            log_level: env_non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: env_parse("LOG_JSON").unwrap_or(false),
            log_dir: env_non_empty("LOG_DIR"),
            notify_mode: env_non_empty("NOTIFY_MODE")
                .and_then(|v| NotifyMode::parse(&v))
                .unwrap_or(NotifyMode::Queue),
            notify_webhook_url: env_non_empty("NOTIFY_WEBHOOK_URL"),
            notify_queue_capacity: env_parse("NOTIFY_QUEUE_CAPACITY").unwrap_or(1024),
            allow_negative_stock: env_parse("ALLOW_NEGATIVE_STOCK").unwrap_or(false),
            max_connections: env_parse("MAX_CONNECTIONS").unwrap_or(1000),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS").unwrap_or(30000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.database_path = format!("{}/store.db", config.work_dir);
        config.http_port = http_port;
        config
    }

    /// 备货扣库存的下限策略
    pub fn fulfilment_guard(&self) -> StockGuard {
        if self.allow_negative_stock {
            StockGuard::Permissive
        } else {
            StockGuard::NonNegative
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
