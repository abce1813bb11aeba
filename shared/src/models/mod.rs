//! Data models
//!
//! Shared between store-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), all timestamps Unix millis.

pub mod campaign;
pub mod coupon;
pub mod order;
pub mod product;
pub mod stock;

// Re-exports
pub use campaign::*;
pub use coupon::*;
pub use order::*;
pub use product::*;
pub use stock::*;
