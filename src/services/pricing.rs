use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{document, price_rule};
use crate::error::AppError;

/// Rate actually used for a document, plus whether it came from the
/// configured default rather than a matching price rule. The fallback flag
/// is a signal for the caller (logging, quote responses), never an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRate {
    pub rate: f64,
    pub fallback: bool,
}

/// Full price quote for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub file_type: String,
    pub rate: f64,
    pub fallback: bool,
    pub price: f64,
}

/// Resolves per-kilobyte rates. The default rate is injected once at
/// construction; the resolver never reads ambient configuration.
#[derive(Debug, Clone, Copy)]
pub struct PricingResolver {
    default_rate: f64,
}

impl PricingResolver {
    pub fn new(default_rate: f64) -> Self {
        Self { default_rate }
    }

    /// Exact-match lookup by file type. Unknown or empty types degrade to
    /// the default rate with `fallback = true`.
    pub async fn resolve(
        &self,
        db: &DatabaseConnection,
        file_type: &str,
    ) -> Result<ResolvedRate, AppError> {
        let rule = price_rule::Entity::find()
            .filter(price_rule::Column::FileType.eq(file_type))
            .one(db)
            .await?;

        Ok(match rule {
            Some(rule) => ResolvedRate {
                rate: rule.rate,
                fallback: false,
            },
            None => ResolvedRate {
                rate: self.default_rate,
                fallback: true,
            },
        })
    }

    pub async fn quote(
        &self,
        db: &DatabaseConnection,
        doc: &document::Model,
    ) -> Result<Quote, AppError> {
        let file_type = doc.file_type();
        let resolved = self.resolve(db, &file_type).await?;
        Ok(Quote {
            file_type,
            rate: resolved.rate,
            fallback: resolved.fallback,
            price: order_price(doc.size_kb, resolved.rate),
        })
    }
}

/// `size_kb * rate`. Both inputs are non-negative, so the result is too;
/// a zero-size document prices at 0 and that is allowed.
pub fn order_price(size_kb: f64, rate: f64) -> f64 {
    size_kb * rate
}
