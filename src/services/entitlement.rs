use sea_orm::DatabaseConnection;

use crate::entities::document;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::services::orders::OrderService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    Allowed,
    Denied(DenialReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Requesting user is neither the document's owner nor a superuser.
    NotOwner,
    /// Owner has no paid ledger entry for this document yet.
    PaymentRequired,
}

/// The gate decision, separated from storage. Superusers bypass the
/// payment check once the role triage passes; everyone else needs a paid
/// ledger entry of their own.
pub fn evaluate(user_id: i32, is_su: bool, owner_id: i32, has_paid_entry: bool) -> Entitlement {
    if user_id != owner_id && !is_su {
        return Entitlement::Denied(DenialReason::NotOwner);
    }
    if is_su || has_paid_entry {
        return Entitlement::Allowed;
    }
    Entitlement::Denied(DenialReason::PaymentRequired)
}

/// Evaluated fresh on every analysis-trigger attempt; the only persisted
/// state consulted is the ledger's `paid` flag.
pub async fn check_entitlement(
    db: &DatabaseConnection,
    user: &AuthUser,
    doc: &document::Model,
) -> Result<Entitlement, AppError> {
    // Only the owner-without-su path needs the ledger row.
    let needs_ledger = user.id == doc.owner_id && !user.is_su();
    let has_paid_entry = if needs_ledger {
        OrderService::new(db.clone())
            .get_entry(user.id, doc.id)
            .await?
            .map(|entry| entry.paid)
            .unwrap_or(false)
    } else {
        false
    };

    Ok(evaluate(user.id, user.is_su(), doc.owner_id, has_paid_entry))
}
