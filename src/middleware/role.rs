use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use crate::middleware::auth::AuthUser;

pub async fn require_su(
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !auth_user.is_su() {
        tracing::warn!(username = %auth_user.username, "access denied: not superuser");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}
