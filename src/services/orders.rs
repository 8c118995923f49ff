use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use uuid::Uuid;

use crate::entities::{cart_item, document};
use crate::error::AppError;
use crate::services::pricing::PricingResolver;

/// What `place_order` did with the ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOrderStatus {
    /// Fresh row inserted, paid immediately.
    Created,
    /// Existing unpaid row repriced and marked paid.
    Updated,
    /// Row was already paid; nothing changed.
    AlreadyPaid,
}

/// Ledger operations for analysis orders. One row per (owner, document);
/// the unique index on that pair backs the upsert.
#[derive(Clone)]
pub struct OrderService {
    db: DatabaseConnection,
}

impl OrderService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_entry(
        &self,
        owner_id: i32,
        document_id: Uuid,
    ) -> Result<Option<cart_item::Model>, AppError> {
        let entry = cart_item::Entity::find()
            .filter(cart_item::Column::OwnerId.eq(owner_id))
            .filter(cart_item::Column::DocumentId.eq(document_id))
            .one(&self.db)
            .await?;
        Ok(entry)
    }

    /// Price the document and upsert the (owner, document) ledger row.
    ///
    /// Already-paid rows are left untouched and reported as `AlreadyPaid`.
    /// Otherwise the price is recomputed from the current rules and the row
    /// is inserted or updated with `paid = true`. Payment is modeled as
    /// immediately successful; a real gateway confirmation would replace
    /// the `paid: Set(true)` below.
    ///
    /// The caller is responsible for the ownership check (entitlement gate).
    pub async fn place_order(
        &self,
        owner_id: i32,
        doc: &document::Model,
        pricing: &PricingResolver,
    ) -> Result<(cart_item::Model, PlaceOrderStatus), AppError> {
        let existing = self.get_entry(owner_id, doc.id).await?;
        if let Some(entry) = &existing {
            if entry.paid {
                tracing::info!(owner_id, document_id = %doc.id, "order already paid");
                return Ok((entry.clone(), PlaceOrderStatus::AlreadyPaid));
            }
        }

        let quote = pricing.quote(&self.db, doc).await?;
        if quote.fallback {
            tracing::info!(
                owner_id,
                document_id = %doc.id,
                file_type = %quote.file_type,
                "no price rule for file type, default rate used"
            );
        }

        if let Some(entry) = existing {
            return self.mark_paid(entry, quote.price).await;
        }

        let now = chrono::Utc::now().naive_utc();
        let item = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            document_id: Set(doc.id),
            price: Set(quote.price),
            paid: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match item.insert(&self.db).await {
            Ok(entry) => {
                tracing::info!(
                    owner_id,
                    document_id = %doc.id,
                    price = entry.price,
                    "order placed"
                );
                Ok((entry, PlaceOrderStatus::Created))
            }
            // A concurrent request inserted the row first. Fall back to
            // read-then-update instead of surfacing the constraint error.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                self.recover_existing(owner_id, doc.id, quote.price).await
            }
            Err(e) => Err(AppError::DatabaseError(e)),
        }
    }

    /// Recovery step after a lost insert race: re-read the (owner, document)
    /// row the competing request created and either report it already paid
    /// or mark it paid at `price`.
    pub async fn recover_existing(
        &self,
        owner_id: i32,
        document_id: Uuid,
        price: f64,
    ) -> Result<(cart_item::Model, PlaceOrderStatus), AppError> {
        let existing = self.get_entry(owner_id, document_id).await?.ok_or_else(|| {
            AppError::InternalServerError(
                "cart entry vanished during concurrent upsert".to_string(),
            )
        })?;

        if existing.paid {
            return Ok((existing, PlaceOrderStatus::AlreadyPaid));
        }
        self.mark_paid(existing, price).await
    }

    /// Pay an existing cart entry at its recorded price, without repricing.
    /// Paying an already-paid entry is an informational no-op.
    pub async fn pay_entry(
        &self,
        owner_id: i32,
        entry_id: Uuid,
    ) -> Result<(cart_item::Model, PlaceOrderStatus), AppError> {
        let entry = cart_item::Entity::find_by_id(entry_id)
            .filter(cart_item::Column::OwnerId.eq(owner_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Cart entry not found".to_string()))?;

        if entry.paid {
            tracing::info!(owner_id, entry_id = %entry.id, "cart entry already paid");
            return Ok((entry, PlaceOrderStatus::AlreadyPaid));
        }
        let price = entry.price;
        self.mark_paid(entry, price).await
    }

    async fn mark_paid(
        &self,
        entry: cart_item::Model,
        price: f64,
    ) -> Result<(cart_item::Model, PlaceOrderStatus), AppError> {
        let mut active: cart_item::ActiveModel = entry.into();
        active.price = Set(price);
        active.paid = Set(true);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;
        tracing::info!(
            owner_id = updated.owner_id,
            document_id = %updated.document_id,
            price = updated.price,
            "unpaid order marked paid"
        );
        Ok((updated, PlaceOrderStatus::Updated))
    }

    /// Delete every cart row owned by `owner_id`, paid or not. Irreversible.
    /// Returns the number of rows removed (may be zero).
    pub async fn clear_cart(&self, owner_id: i32) -> Result<u64, AppError> {
        let res = cart_item::Entity::delete_many()
            .filter(cart_item::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await?;
        tracing::info!(owner_id, removed = res.rows_affected, "cart cleared");
        Ok(res.rows_affected)
    }
}
