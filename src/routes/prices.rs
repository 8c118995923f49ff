use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};

use crate::entities::price_rule::{self, Entity as PriceRule};
use crate::error::AppError;
use crate::state::AppState;

// Price rules are administrative data: the pricing workflow only reads
// them, and this superuser endpoint is how they get in.

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpsertPriceRuleRequest {
    /// Price per kilobyte; must be non-negative.
    pub rate: f64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PriceRuleResponse {
    pub file_type: String,
    pub rate: f64,
}

impl From<price_rule::Model> for PriceRuleResponse {
    fn from(model: price_rule::Model) -> Self {
        Self {
            file_type: model.file_type,
            rate: model.rate,
        }
    }
}

#[utoipa::path(
    get,
    path = "/prices",
    responses(
        (status = 200, description = "All configured price rules", body = [PriceRuleResponse])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Pricing"
)]
pub async fn list_price_rules(
    State(state): State<AppState>,
) -> Result<Json<Vec<PriceRuleResponse>>, AppError> {
    let rules = PriceRule::find()
        .order_by_asc(price_rule::Column::FileType)
        .all(&state.db)
        .await?;
    Ok(Json(rules.into_iter().map(PriceRuleResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/prices/{file_type}",
    params(
        ("file_type" = String, Path, description = "File-type key, e.g. \"pdf\"; stored lowercased")
    ),
    request_body = UpsertPriceRuleRequest,
    responses(
        (status = 200, description = "Price rule created or updated", body = PriceRuleResponse),
        (status = 400, description = "Invalid rate or file type")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Pricing"
)]
pub async fn upsert_price_rule(
    State(state): State<AppState>,
    Path(file_type): Path<String>,
    Json(payload): Json<UpsertPriceRuleRequest>,
) -> Result<Json<PriceRuleResponse>, AppError> {
    if !payload.rate.is_finite() || payload.rate < 0.0 {
        return Err(AppError::BadRequest(
            "Rate must be a non-negative number".to_string(),
        ));
    }
    let file_type = file_type.trim().to_lowercase();
    if file_type.is_empty() {
        return Err(AppError::BadRequest("File type must not be empty".to_string()));
    }

    let rule = price_rule::ActiveModel {
        file_type: Set(file_type.clone()),
        rate: Set(payload.rate),
        ..Default::default()
    };

    // Insert-first; a unique violation means the rule exists (possibly
    // created by a racing request), so retry as an update.
    let saved = match rule.insert(&state.db).await {
        Ok(rule) => rule,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            let existing = PriceRule::find()
                .filter(price_rule::Column::FileType.eq(&file_type))
                .one(&state.db)
                .await?
                .ok_or_else(|| {
                    AppError::InternalServerError(
                        "price rule vanished during concurrent upsert".to_string(),
                    )
                })?;
            let mut active = existing.into_active_model();
            active.rate = Set(payload.rate);
            active.update(&state.db).await?
        }
        Err(e) => return Err(AppError::DatabaseError(e)),
    };

    tracing::info!(file_type = %saved.file_type, rate = saved.rate, "price rule upserted");
    Ok(Json(PriceRuleResponse::from(saved)))
}
