//! 库存
//!
//! 所有库存变更都经过 [`ledger`]：原子更新 `product.stock` 并追加一条
//! `stock_movement` 记录。

pub mod ledger;

pub use ledger::{StockChange, StockGuard, StockLedger, StockMovementInput, apply_in_tx};
