use axum::{
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use crate::entities::user;

/// Identity of the requesting user, decoded from a bearer token issued by
/// the external auth proxy. This service never mints tokens itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: user::Role,
}

impl AuthUser {
    pub fn is_su(&self) -> bool {
        self.role.is_su()
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    uid: i32,
    exp: usize,
    role: user::Role,
}

pub async fn auth_middleware(
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Check Bearer prefix
    if !auth_header.starts_with("Bearer ") {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = &auth_header[7..]; // Remove "Bearer " prefix

    // Decode and validate JWT
    let secret = &crate::config::get_config().jwt_secret;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "JWT decode failed");
        StatusCode::UNAUTHORIZED
    })?;

    // Create AuthUser from claims
    let auth_user = AuthUser {
        id: token_data.claims.uid,
        username: token_data.claims.sub,
        role: token_data.claims.role,
    };

    // Insert auth user into request extensions
    req.extensions_mut().insert(auth_user);

    Ok(next.run(req).await)
}
