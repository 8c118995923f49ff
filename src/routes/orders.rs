use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::cart_item::{self, Entity as CartItem};
use crate::entities::document::Entity as Document;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::services::orders::{OrderService, PlaceOrderStatus};
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct PriceQuoteResponse {
    pub document_id: Uuid,
    pub file_type: String,
    pub rate: f64,
    /// True when no price rule matched and the configured default rate
    /// was applied.
    pub default_rate_used: bool,
    pub order_price: f64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub document_id: Uuid,
    pub price: f64,
    pub paid: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<cart_item::Model> for CartItemResponse {
    fn from(model: cart_item::Model) -> Self {
        Self {
            id: model.id,
            document_id: model.document_id,
            price: model.price,
            paid: model.paid,
            created_at: model.created_at.to_string(),
            updated_at: model.updated_at.to_string(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PlaceOrderResponse {
    pub entry: CartItemResponse,
    /// "created", "updated" or "already_paid".
    pub status: String,
    pub message: String,
}

impl PlaceOrderResponse {
    fn from_outcome(entry: cart_item::Model, status: PlaceOrderStatus) -> Self {
        let (status_str, message) = match status {
            PlaceOrderStatus::Created => ("created", "Payment successful, analysis unlocked"),
            PlaceOrderStatus::Updated => ("updated", "Payment successful, analysis unlocked"),
            PlaceOrderStatus::AlreadyPaid => {
                ("already_paid", "You have already paid for this analysis")
            }
        };
        Self {
            entry: CartItemResponse::from(entry),
            status: status_str.to_string(),
            message: message.to_string(),
        }
    }
}

/// Orders may only be placed (or quoted) by the document's owner; the
/// entitlement gate handles superusers separately, they never pay.
async fn find_own_document(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> Result<crate::entities::document::Model, AppError> {
    let doc = Document::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    if doc.owner_id != user.id {
        return Err(AppError::Forbidden(
            "You do not have access to this document".to_string(),
        ));
    }
    Ok(doc)
}

#[utoipa::path(
    get,
    path = "/documents/{id}/price",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Price quote for analyzing this document", body = PriceQuoteResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Orders"
)]
pub async fn quote_price(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PriceQuoteResponse>, AppError> {
    let doc = find_own_document(&state, &user, id).await?;
    let quote = state.pricing.quote(&state.db, &doc).await?;

    if quote.fallback {
        tracing::info!(
            document_id = %doc.id,
            file_type = %quote.file_type,
            "quote used default rate"
        );
    }

    Ok(Json(PriceQuoteResponse {
        document_id: doc.id,
        file_type: quote.file_type,
        rate: quote.rate,
        default_rate_used: quote.fallback,
        order_price: quote.price,
    }))
}

#[utoipa::path(
    post,
    path = "/documents/{id}/order",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Order placed (or already paid)", body = PlaceOrderResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlaceOrderResponse>, AppError> {
    let doc = find_own_document(&state, &user, id).await?;

    let orders = OrderService::new(state.db.clone());
    let (entry, status) = orders.place_order(user.id, &doc, &state.pricing).await?;

    Ok(Json(PlaceOrderResponse::from_outcome(entry, status)))
}

#[utoipa::path(
    post,
    path = "/cart/{id}/pay",
    params(
        ("id" = Uuid, Path, description = "Cart entry ID")
    ),
    responses(
        (status = 200, description = "Entry paid at its recorded price (or already paid)", body = PlaceOrderResponse),
        (status = 404, description = "Cart entry not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Orders"
)]
pub async fn pay_cart_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlaceOrderResponse>, AppError> {
    let (entry, status) = OrderService::new(state.db.clone())
        .pay_entry(user.id, id)
        .await?;
    Ok(Json(PlaceOrderResponse::from_outcome(entry, status)))
}

#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Cart entries of the requesting user", body = [CartItemResponse])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Orders"
)]
pub async fn list_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<CartItemResponse>>, AppError> {
    let items = CartItem::find()
        .filter(cart_item::Column::OwnerId.eq(user.id))
        .order_by_desc(cart_item::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(items.into_iter().map(CartItemResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/cart/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart entry ID")
    ),
    responses(
        (status = 200, description = "Cart entry details", body = CartItemResponse),
        (status = 404, description = "Cart entry not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Orders"
)]
pub async fn cart_detail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CartItemResponse>, AppError> {
    let item = CartItem::find_by_id(id)
        .filter(cart_item::Column::OwnerId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart entry not found".to_string()))?;
    Ok(Json(CartItemResponse::from(item)))
}

#[utoipa::path(
    delete,
    path = "/cart",
    responses(
        (status = 200, description = "Cart cleared, count of removed entries returned")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Orders"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = OrderService::new(state.db.clone())
        .clear_cart(user.id)
        .await?;
    Ok(Json(serde_json::json!({
        "message": "Cart cleared",
        "removed": removed
    })))
}
