//! 认证中间件
//!
//! 为 JWT 认证和授权提供 Axum 中间件

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::ErrorCode;

use crate::auth::CurrentUser;
use crate::auth::extractor::authenticate_parts;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::AppError;

/// 认证中间件 - 解析可选的 Bearer 令牌
///
/// 店面接口允许匿名访问，因此没有 Authorization 头时直接放行；
/// 令牌有效时将 [`CurrentUser`] 注入请求扩展。
///
/// | 情况 | 结果 |
/// |------|------|
/// | 无 Authorization 头 | 放行 (匿名) |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 | 401 TokenInvalid |
pub async fn authenticate(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // CORS 预检
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();
    if let Some(user) = authenticate_parts(&parts, &state.jwt_service)? {
        parts.extensions.insert(user);
    }
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// 店员中间件 - 要求 staff 或 admin 角色
///
/// # 错误
///
/// 未登录返回 401，非店员返回 403
pub async fn require_staff(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::unauthorized())?;
    if !user.is_staff() {
        security_log!(
            "WARN",
            "staff_required",
            user_id = user.id,
            username = user.username.clone(),
            user_role = user.role.as_str()
        );
        return Err(AppError::new(ErrorCode::StaffRequired));
    }

    Ok(next.run(req).await)
}
