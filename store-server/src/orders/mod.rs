//! 订单模块
//!
//! - **builder**: 购物车定价（活动 + 优惠券）与订单创建
//! - **service**: 订单状态机，状态变更与库存联动
//! - **pickup_code**: 6 位十六进制取货码
//!
//! # 状态流转
//!
//! ```text
//! PENDING ──→ PREPARING ──→ READY ──→ COMPLETED
//!    │            │           │
//!    └────────────┴───────────┴──→ CANCELLED
//! ```
//!
//! PENDING → PREPARING 扣减库存；从 PREPARING / READY 取消时回补库存。

pub mod builder;
pub mod pickup_code;
pub mod service;

#[cfg(test)]
mod tests;

pub use builder::{CartQuote, CartQuoteRequest, OrderBuilder, QuoteLine};
pub use service::OrderService;
