//! Pickup codes: 3 random bytes as 6 uppercase hex chars

use rand::Rng;
use shared::error::AppResult;
use sqlx::SqlitePool;

use crate::db::repository::order as order_repo;

pub const PICKUP_CODE_LEN: usize = 6;

/// Collisions between warnings (16^6 codes)
const WARN_EVERY: usize = 32;

pub fn generate_pickup_code() -> String {
    let mut bytes = [0u8; 3];
    rand::thread_rng().fill(&mut bytes);
    hex::encode_upper(bytes)
}

/// Trim + uppercase
pub fn normalize_pickup_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub fn is_valid_pickup_code(code: &str) -> bool {
    code.len() == PICKUP_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

/// Generate a code not used by any existing order.
///
/// Keeps drawing until a free code turns up; the unique index on
/// `orders.pickup_code` still guards the insert.
pub async fn unique_pickup_code(pool: &SqlitePool) -> AppResult<String> {
    unique_pickup_code_from(pool, generate_pickup_code).await
}

pub(crate) async fn unique_pickup_code_from(
    pool: &SqlitePool,
    mut next: impl FnMut() -> String,
) -> AppResult<String> {
    let mut collisions = 0usize;
    loop {
        let code = next();
        if !order_repo::pickup_code_exists(pool, &code).await? {
            return Ok(code);
        }
        collisions += 1;
        if collisions % WARN_EVERY == 0 {
            tracing::warn!(collisions, "Pickup code space crowded, still retrying");
        } else {
            tracing::debug!(code = %code, "Pickup code collision, retrying");
        }
    }
}
