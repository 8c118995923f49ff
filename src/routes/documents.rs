use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::document::{self, Entity as Document};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub owner_id: i32,
    pub filename: String,
    pub size_kb: f64,
    pub external_id: i64,
    pub created_at: String,
}

impl From<document::Model> for DocumentResponse {
    fn from(model: document::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            filename: model.filename,
            size_kb: model.size_kb,
            external_id: model.external_id,
            created_at: model.created_at.to_string(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentTextResponse {
    pub id: Uuid,
    pub texts: Vec<String>,
}

/// Fetch a document and enforce the owner-or-superuser rule shared by the
/// read/delete handlers.
async fn find_owned(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> Result<document::Model, AppError> {
    let doc = Document::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    if doc.owner_id != user.id && !user.is_su() {
        return Err(AppError::Forbidden(
            "You do not have access to this document".to_string(),
        ));
    }
    Ok(doc)
}

#[utoipa::path(
    post,
    path = "/documents",
    tag = "Documents",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document uploaded and registered", body = DocumentResponse),
        (status = 400, description = "Bad request"),
        (status = 502, description = "Analysis service rejected the upload")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<(axum::http::StatusCode, Json<DocumentResponse>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() == Some("document") {
            let filename = field.file_name().unwrap_or("unknown").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|_| AppError::InternalServerError("Failed to read file bytes".to_string()))?;
            let size_kb = data.len() as f64 / 1024.0;

            // Register with the analysis service first; no local row is
            // created unless the upload is acknowledged.
            let external_id = state
                .analysis
                .upload_document(&filename, &content_type, data.to_vec())
                .await?;

            let doc_id = Uuid::new_v4();
            let media_root = &crate::config::get_config().media_root;
            let storage_path = format!("{}/{}_{}", media_root, doc_id, filename);

            tokio::fs::create_dir_all(media_root).await.map_err(|e| {
                AppError::InternalServerError(format!("Failed to create media dir: {e}"))
            })?;
            tokio::fs::write(&storage_path, &data).await.map_err(|e| {
                AppError::InternalServerError(format!("Failed to store file: {e}"))
            })?;

            let doc = document::ActiveModel {
                id: Set(doc_id),
                owner_id: Set(user.id),
                filename: Set(filename),
                storage_path: Set(storage_path),
                size_kb: Set(size_kb),
                external_id: Set(external_id),
                created_at: Set(chrono::Utc::now().naive_utc()),
            };
            let saved = doc.insert(&state.db).await?;

            tracing::info!(
                document_id = %saved.id,
                owner_id = saved.owner_id,
                external_id = saved.external_id,
                size_kb = saved.size_kb,
                "document uploaded"
            );
            return Ok((
                axum::http::StatusCode::CREATED,
                Json(DocumentResponse::from(saved)),
            ));
        }
    }

    Err(AppError::BadRequest("No document field found".to_string()))
}

#[utoipa::path(
    get,
    path = "/documents",
    responses(
        (status = 200, description = "Documents of the requesting user (all documents for superusers)", body = [DocumentResponse])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Documents"
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let mut query = Document::find().order_by_desc(document::Column::CreatedAt);
    if !user.is_su() {
        query = query.filter(document::Column::OwnerId.eq(user.id));
    }
    let docs = query.all(&state.db).await?;
    Ok(Json(docs.into_iter().map(DocumentResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document details", body = DocumentResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Documents"
)]
pub async fn get_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = find_owned(&state, &user, id).await?;
    Ok(Json(DocumentResponse::from(doc)))
}

#[utoipa::path(
    get,
    path = "/documents/{id}/text",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Extracted text", body = DocumentTextResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found"),
        (status = 502, description = "Analysis service failure")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Documents"
)]
pub async fn get_document_text(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentTextResponse>, AppError> {
    let doc = find_owned(&state, &user, id).await?;
    let texts = state.analysis.fetch_text(doc.external_id).await?;
    Ok(Json(DocumentTextResponse { id: doc.id, texts }))
}

#[utoipa::path(
    delete,
    path = "/documents/{id}",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Documents"
)]
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let doc = find_owned(&state, &user, id).await?;

    // Best-effort cleanup at the analysis service and on disk; the local
    // row (and its cart entries, via cascade) goes away regardless.
    if let Err(e) = state.analysis.delete_document(doc.external_id).await {
        tracing::warn!(document_id = %doc.id, error = ?e, "external delete failed");
    }
    if let Err(e) = tokio::fs::remove_file(&doc.storage_path).await {
        tracing::warn!(document_id = %doc.id, error = %e, "stored file removal failed");
    }

    Document::delete_by_id(doc.id).exec(&state.db).await?;

    tracing::info!(document_id = %doc.id, owner_id = doc.owner_id, "document deleted");
    Ok(Json(serde_json::json!({
        "message": "Document deleted successfully",
        "id": doc.id
    })))
}
