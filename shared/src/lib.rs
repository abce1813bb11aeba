//! Shared types for the stationery storefront
//!
//! Common types used by the server and API clients: data models,
//! error codes and the unified response envelope.

pub mod error;
pub mod models;
pub mod util;
