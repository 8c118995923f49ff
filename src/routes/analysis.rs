use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::EntityTrait;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::document::Entity as Document;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::services::entitlement::{self, DenialReason, Entitlement};
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct AnalysisResponse {
    pub document_id: Uuid,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/documents/{id}/analyze",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Analysis started", body = AnalysisResponse),
        (status = 402, description = "Payment required; response carries the order path"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found"),
        (status = 502, description = "Analysis service failure; safe to retry without re-paying")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analysis"
)]
pub async fn trigger_analysis(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let doc = Document::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    // Gate is evaluated fresh on every attempt; nothing is cached beyond
    // the ledger's paid flag.
    match entitlement::check_entitlement(&state.db, &user, &doc).await? {
        Entitlement::Denied(DenialReason::NotOwner) => {
            return Err(AppError::Forbidden(
                "You do not have access to this document".to_string(),
            ));
        }
        Entitlement::Denied(DenialReason::PaymentRequired) => {
            return Err(AppError::PaymentRequired {
                message: "Pay for the analysis first".to_string(),
                order_path: format!("/documents/{}/order", doc.id),
            });
        }
        Entitlement::Allowed => {}
    }

    // Upstream failure propagates as 502 and leaves the ledger untouched;
    // the user retries without paying again.
    state.analysis.trigger_analysis(doc.external_id).await?;

    tracing::info!(document_id = %doc.id, user_id = user.id, "analysis triggered");
    Ok(Json(AnalysisResponse {
        document_id: doc.id,
        message: "Analysis started".to_string(),
    }))
}
