pub mod analysis;
pub mod documents;
pub mod home;
pub mod orders;
pub mod prices;
pub mod users;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::auth_middleware;
use crate::middleware::role::require_su;
use crate::state::AppState;

// Define the OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // General endpoints
        home::root,
        // Document library
        documents::upload_document,
        documents::list_documents,
        documents::get_document,
        documents::get_document_text,
        documents::delete_document,
        // Pricing and orders
        prices::list_price_rules,
        prices::upsert_price_rule,
        orders::quote_price,
        orders::place_order,
        orders::list_cart,
        orders::cart_detail,
        orders::pay_cart_item,
        orders::clear_cart,
        // Analysis trigger
        analysis::trigger_analysis,
        // User provisioning
        users::create_user,
        users::list_users,
        users::delete_user,
    ),
    components(
        schemas(
            home::RootResponse,
            documents::DocumentResponse,
            documents::DocumentTextResponse,
            prices::UpsertPriceRuleRequest,
            prices::PriceRuleResponse,
            orders::PriceQuoteResponse,
            orders::CartItemResponse,
            orders::PlaceOrderResponse,
            analysis::AnalysisResponse,
            users::CreateUserRequest,
            users::UserResponse,
            crate::entities::user::Role,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Documents", description = "Per-user document library, backed by the external analysis service"),
        (name = "Pricing", description = "Per-kilobyte price rules (superuser-managed)"),
        (name = "Orders", description = "Price quotes, order placement and the cart ledger"),
        (name = "Analysis", description = "Payment-gated analysis trigger"),
        (name = "User Management", description = "Local user provisioning (superuser access required)")
    ),
    info(
        title = "DocAnalysisKit API",
        version = "0.1.0",
        description = "Document library with a paid analysis workflow: per-kilobyte pricing, cart ledger, and a payment-gated trigger against an external analysis service",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

// Add security scheme for JWT Bearer tokens
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer
                )
            ),
        );
    }
}

pub fn create_routes(state: AppState) -> Router {
    // Swagger UI (stateless)
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    // Protected routes that require auth
    let protected_routes = Router::new()
        .route("/documents", post(documents::upload_document))
        .route("/documents", get(documents::list_documents))
        .route("/documents/{id}", get(documents::get_document))
        .route("/documents/{id}", delete(documents::delete_document))
        .route("/documents/{id}/text", get(documents::get_document_text))
        .route("/documents/{id}/price", get(orders::quote_price))
        .route("/documents/{id}/order", post(orders::place_order))
        .route("/documents/{id}/analyze", post(analysis::trigger_analysis))
        .route("/cart", get(orders::list_cart))
        .route("/cart", delete(orders::clear_cart))
        .route("/cart/{id}", get(orders::cart_detail))
        .route("/cart/{id}/pay", post(orders::pay_cart_item))
        .route("/prices", get(prices::list_price_rules))
        .layer(middleware::from_fn(auth_middleware));

    // Su-only routes
    let su_routes = Router::new()
        .route("/users", post(users::create_user))
        .route("/users", get(users::list_users))
        .route("/users/{id}", delete(users::delete_user))
        .route("/prices/{file_type}", put(prices::upsert_price_rule))
        .layer(middleware::from_fn(require_su))
        .layer(middleware::from_fn(auth_middleware));

    // Public routes (no auth required) and merge all together
    let app_routes = Router::new()
        .route("/", get(home::root))
        .merge(protected_routes)
        .merge(su_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Merge Swagger UI (which has no state) with the rest
    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
}
