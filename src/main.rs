use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tracing_subscriber::EnvFilter;

use doc_analysis_kit::config;
use doc_analysis_kit::routes;
use doc_analysis_kit::services::analysis::AnalysisClient;
use doc_analysis_kit::services::pricing::PricingResolver;
use doc_analysis_kit::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::get_config();

    let db = Database::connect(config.database_url.clone())
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    let state = AppState {
        db,
        pricing: PricingResolver::new(config.default_price_per_kb),
        analysis: AnalysisClient::new(config.analysis_base_url.clone()),
    };

    let app = routes::create_routes(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.expect("Server error");
}
