use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set, SqlErr};
use serde::{Deserialize, Serialize};

use crate::entities::user::{self, Entity as User, Role};
use crate::error::AppError;
use crate::state::AppState;

// Local user rows only anchor document ownership; credentials and sessions
// live in the external auth proxy, so provisioning is just username + role.

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    username: String,
    role: Role,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    id: i32,
    username: String,
    role: Role,
    created_at: chrono::NaiveDateTime,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 409, description = "Username already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User Management"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = user::ActiveModel {
        username: Set(payload.username),
        role: Set(payload.role),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    match user.insert(&state.db).await {
        Ok(created) => {
            tracing::info!(username = %created.username, "user created");
            Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(AppError::Conflict("Username already exists".to_string()))
        }
        Err(e) => Err(AppError::DatabaseError(e)),
    }
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "List of all users", body = [UserResponse]),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User Management"
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = User::find().all(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(
        ("id" = i32, Path, description = "User ID to delete")
    ),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User Management"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // Cascades to the user's documents and cart entries.
    let active: user::ActiveModel = user.into();
    active.delete(&state.db).await?;

    tracing::info!(user_id, "user deleted");
    Ok(Json(serde_json::json!({
        "message": "User deleted successfully"
    })))
}
