use sea_orm::DatabaseConnection;

use crate::services::analysis::AnalysisClient;
use crate::services::pricing::PricingResolver;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub pricing: PricingResolver,
    pub analysis: AnalysisClient,
}
