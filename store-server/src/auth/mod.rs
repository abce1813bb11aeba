//! 认证授权模块
//!
//! - [`JwtService`] - JWT 令牌验证
//! - [`CurrentUser`] - 当前用户上下文
//! - [`authenticate`] - 认证中间件 (可选令牌)
//! - [`require_staff`] - 店员权限中间件

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService, Role};
pub use middleware::{authenticate, require_staff};
