//! Order/pricing and entitlement workflow tests against an in-memory
//! SQLite store, using the real migrations.

use axum::extract::{Path as UrlPath, State};
use axum::Json;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use doc_analysis_kit::entities::{cart_item, document, price_rule, user};
use doc_analysis_kit::error::AppError;
use doc_analysis_kit::middleware::auth::AuthUser;
use doc_analysis_kit::routes::prices::{upsert_price_rule, UpsertPriceRuleRequest};
use doc_analysis_kit::services::analysis::AnalysisClient;
use doc_analysis_kit::services::entitlement::{self, DenialReason, Entitlement};
use doc_analysis_kit::services::orders::{OrderService, PlaceOrderStatus};
use doc_analysis_kit::services::pricing::PricingResolver;
use doc_analysis_kit::state::AppState;

async fn setup_db() -> DatabaseConnection {
    // A single pooled connection keeps the in-memory database alive for
    // the whole test; extra pool connections would each see an empty db.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1);
    let db = Database::connect(opt).await.expect("sqlite connect");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

async fn seed_user(db: &DatabaseConnection, username: &str, role: user::Role) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        role: Set(role),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

async fn seed_document(
    db: &DatabaseConnection,
    owner_id: i32,
    filename: &str,
    size_kb: f64,
) -> document::Model {
    document::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        filename: Set(filename.to_string()),
        storage_path: Set(format!("media/{filename}")),
        size_kb: Set(size_kb),
        external_id: Set(4242),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(db)
    .await
    .expect("insert document")
}

async fn seed_rule(db: &DatabaseConnection, file_type: &str, rate: f64) {
    price_rule::ActiveModel {
        file_type: Set(file_type.to_string()),
        rate: Set(rate),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert price rule");
}

fn auth(user: &user::Model) -> AuthUser {
    AuthUser {
        id: user.id,
        username: user.username.clone(),
        role: user.role,
    }
}

async fn seed_cart_entry(
    db: &DatabaseConnection,
    owner_id: i32,
    document_id: Uuid,
    price: f64,
    paid: bool,
) -> cart_item::Model {
    let now = chrono::Utc::now().naive_utc();
    cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        document_id: Set(document_id),
        price: Set(price),
        paid: Set(paid),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert cart entry")
}

async fn cart_rows(db: &DatabaseConnection, owner_id: i32, document_id: Uuid) -> u64 {
    cart_item::Entity::find()
        .filter(cart_item::Column::OwnerId.eq(owner_id))
        .filter(cart_item::Column::DocumentId.eq(document_id))
        .count(db)
        .await
        .expect("count cart rows")
}

#[tokio::test]
async fn resolver_uses_rule_rate_when_present() {
    let db = setup_db().await;
    seed_rule(&db, "pdf", 2.5).await;

    let pricing = PricingResolver::new(1.0);
    let resolved = pricing.resolve(&db, "pdf").await.unwrap();
    assert_eq!(resolved.rate, 2.5);
    assert!(!resolved.fallback);
}

#[tokio::test]
async fn resolver_falls_back_to_default_for_unknown_type() {
    let db = setup_db().await;
    seed_rule(&db, "pdf", 2.5).await;

    let pricing = PricingResolver::new(0.75);
    let resolved = pricing.resolve(&db, "xyz").await.unwrap();
    assert_eq!(resolved.rate, 0.75);
    assert!(resolved.fallback);

    // Empty type (filename without extension) degrades the same way.
    let resolved = pricing.resolve(&db, "").await.unwrap();
    assert!(resolved.fallback);
}

#[tokio::test]
async fn quote_multiplies_size_by_resolved_rate() {
    let db = setup_db().await;
    let owner = seed_user(&db, "alice", user::Role::User).await;
    seed_rule(&db, "png", 1.0).await;
    let doc = seed_document(&db, owner.id, "scan.png", 100.0).await;

    let pricing = PricingResolver::new(9.0);
    let quote = pricing.quote(&db, &doc).await.unwrap();
    assert_eq!(quote.file_type, "png");
    assert_eq!(quote.price, 100.0);
    assert!(!quote.fallback);
}

#[tokio::test]
async fn quote_of_zero_size_document_is_zero() {
    let db = setup_db().await;
    let owner = seed_user(&db, "alice", user::Role::User).await;
    let doc = seed_document(&db, owner.id, "empty.txt", 0.0).await;

    let quote = PricingResolver::new(3.0).quote(&db, &doc).await.unwrap();
    assert_eq!(quote.price, 0.0);
    assert!(quote.fallback);
}

#[tokio::test]
async fn place_order_creates_paid_entry() {
    let db = setup_db().await;
    let owner = seed_user(&db, "alice", user::Role::User).await;
    seed_rule(&db, "png", 1.0).await;
    let doc = seed_document(&db, owner.id, "scan.png", 100.0).await;

    let orders = OrderService::new(db.clone());
    let pricing = PricingResolver::new(1.0);
    let (entry, status) = orders.place_order(owner.id, &doc, &pricing).await.unwrap();

    assert_eq!(status, PlaceOrderStatus::Created);
    assert!(entry.paid);
    assert_eq!(entry.price, 100.0);
    assert_eq!(cart_rows(&db, owner.id, doc.id).await, 1);
}

#[tokio::test]
async fn place_order_is_idempotent_once_paid() {
    let db = setup_db().await;
    let owner = seed_user(&db, "alice", user::Role::User).await;
    seed_rule(&db, "png", 1.0).await;
    let doc = seed_document(&db, owner.id, "scan.png", 100.0).await;

    let orders = OrderService::new(db.clone());
    let pricing = PricingResolver::new(1.0);
    let (first, status) = orders.place_order(owner.id, &doc, &pricing).await.unwrap();
    assert_eq!(status, PlaceOrderStatus::Created);

    // A rate change after payment must not reprice the paid entry.
    let rule = price_rule::Entity::find()
        .filter(price_rule::Column::FileType.eq("png"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut active: price_rule::ActiveModel = rule.into();
    active.rate = Set(5.0);
    active.update(&db).await.unwrap();

    let (second, status) = orders.place_order(owner.id, &doc, &pricing).await.unwrap();
    assert_eq!(status, PlaceOrderStatus::AlreadyPaid);
    assert_eq!(second.id, first.id);
    assert_eq!(second.price, 100.0);
    assert!(second.paid);
    assert_eq!(cart_rows(&db, owner.id, doc.id).await, 1);
}

#[tokio::test]
async fn place_order_reprices_and_pays_an_unpaid_entry() {
    let db = setup_db().await;
    let owner = seed_user(&db, "alice", user::Role::User).await;
    seed_rule(&db, "png", 2.0).await;
    let doc = seed_document(&db, owner.id, "scan.png", 50.0).await;

    // Unpaid row with a stale price, as if priced before a rate change.
    let now = chrono::Utc::now().naive_utc();
    cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner.id),
        document_id: Set(doc.id),
        price: Set(1.0),
        paid: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await
    .unwrap();

    let orders = OrderService::new(db.clone());
    let (entry, status) = orders
        .place_order(owner.id, &doc, &PricingResolver::new(1.0))
        .await
        .unwrap();

    assert_eq!(status, PlaceOrderStatus::Updated);
    assert!(entry.paid);
    assert_eq!(entry.price, 100.0);
    assert_eq!(cart_rows(&db, owner.id, doc.id).await, 1);
}

#[tokio::test]
async fn insert_race_recovery_pays_the_competing_unpaid_row() {
    let db = setup_db().await;
    let owner = seed_user(&db, "alice", user::Role::User).await;
    let doc = seed_document(&db, owner.id, "scan.png", 50.0).await;

    // Row a competing request would have created just before our insert.
    seed_cart_entry(&db, owner.id, doc.id, 1.0, false).await;

    let orders = OrderService::new(db.clone());
    let (entry, status) = orders.recover_existing(owner.id, doc.id, 50.0).await.unwrap();

    assert_eq!(status, PlaceOrderStatus::Updated);
    assert!(entry.paid);
    assert_eq!(entry.price, 50.0);
    assert_eq!(cart_rows(&db, owner.id, doc.id).await, 1);
}

#[tokio::test]
async fn insert_race_recovery_leaves_a_paid_row_untouched() {
    let db = setup_db().await;
    let owner = seed_user(&db, "alice", user::Role::User).await;
    let doc = seed_document(&db, owner.id, "scan.png", 50.0).await;

    seed_cart_entry(&db, owner.id, doc.id, 10.0, true).await;

    let orders = OrderService::new(db.clone());
    let (entry, status) = orders.recover_existing(owner.id, doc.id, 99.0).await.unwrap();

    assert_eq!(status, PlaceOrderStatus::AlreadyPaid);
    assert_eq!(entry.price, 10.0);
    assert_eq!(cart_rows(&db, owner.id, doc.id).await, 1);
}

#[tokio::test]
async fn pay_entry_uses_the_recorded_price_and_is_idempotent() {
    let db = setup_db().await;
    let alice = seed_user(&db, "alice", user::Role::User).await;
    let bob = seed_user(&db, "bob", user::Role::User).await;
    // A rule that would price this document differently; paying an
    // existing entry must not reprice it.
    seed_rule(&db, "png", 9.0).await;
    let doc = seed_document(&db, alice.id, "scan.png", 50.0).await;
    let unpaid = seed_cart_entry(&db, alice.id, doc.id, 10.0, false).await;

    let orders = OrderService::new(db.clone());

    // Other owners cannot pay the entry.
    let err = orders.pay_entry(bob.id, unpaid.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let (entry, status) = orders.pay_entry(alice.id, unpaid.id).await.unwrap();
    assert_eq!(status, PlaceOrderStatus::Updated);
    assert!(entry.paid);
    assert_eq!(entry.price, 10.0);

    let (again, status) = orders.pay_entry(alice.id, unpaid.id).await.unwrap();
    assert_eq!(status, PlaceOrderStatus::AlreadyPaid);
    assert_eq!(again.price, 10.0);
    assert_eq!(cart_rows(&db, alice.id, doc.id).await, 1);
}

#[tokio::test]
async fn price_rule_upsert_updates_on_duplicate_create() {
    let db = setup_db().await;
    let state = AppState {
        db: db.clone(),
        pricing: PricingResolver::new(1.0),
        analysis: AnalysisClient::new("http://localhost:9"),
    };

    let Json(created) = upsert_price_rule(
        State(state.clone()),
        UrlPath("PDF".to_string()),
        Json(UpsertPriceRuleRequest { rate: 2.0 }),
    )
    .await
    .unwrap();
    assert_eq!(created.file_type, "pdf");
    assert_eq!(created.rate, 2.0);

    // Same key again hits the unique constraint path and updates the rate.
    let Json(updated) = upsert_price_rule(
        State(state),
        UrlPath("pdf".to_string()),
        Json(UpsertPriceRuleRequest { rate: 3.0 }),
    )
    .await
    .unwrap();
    assert_eq!(updated.file_type, "pdf");
    assert_eq!(updated.rate, 3.0);

    let rules = price_rule::Entity::find().all(&db).await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].rate, 3.0);
}

#[tokio::test]
async fn entitlement_denies_non_owner_even_after_owner_paid() {
    let db = setup_db().await;
    let alice = seed_user(&db, "alice", user::Role::User).await;
    let bob = seed_user(&db, "bob", user::Role::User).await;
    let doc = seed_document(&db, alice.id, "scan.png", 10.0).await;

    OrderService::new(db.clone())
        .place_order(alice.id, &doc, &PricingResolver::new(1.0))
        .await
        .unwrap();

    let verdict = entitlement::check_entitlement(&db, &auth(&bob), &doc)
        .await
        .unwrap();
    assert_eq!(verdict, Entitlement::Denied(DenialReason::NotOwner));
}

#[tokio::test]
async fn entitlement_allows_superuser_without_any_entry() {
    let db = setup_db().await;
    let alice = seed_user(&db, "alice", user::Role::User).await;
    let root = seed_user(&db, "root", user::Role::Su).await;
    let doc = seed_document(&db, alice.id, "scan.png", 10.0).await;

    let verdict = entitlement::check_entitlement(&db, &auth(&root), &doc)
        .await
        .unwrap();
    assert_eq!(verdict, Entitlement::Allowed);
}

#[tokio::test]
async fn entitlement_requires_payment_from_owner() {
    let db = setup_db().await;
    let alice = seed_user(&db, "alice", user::Role::User).await;
    let doc = seed_document(&db, alice.id, "scan.png", 10.0).await;

    let verdict = entitlement::check_entitlement(&db, &auth(&alice), &doc)
        .await
        .unwrap();
    assert_eq!(verdict, Entitlement::Denied(DenialReason::PaymentRequired));

    OrderService::new(db.clone())
        .place_order(alice.id, &doc, &PricingResolver::new(1.0))
        .await
        .unwrap();

    let verdict = entitlement::check_entitlement(&db, &auth(&alice), &doc)
        .await
        .unwrap();
    assert_eq!(verdict, Entitlement::Allowed);
}

#[tokio::test]
async fn clear_cart_only_touches_the_given_owner() {
    let db = setup_db().await;
    let alice = seed_user(&db, "alice", user::Role::User).await;
    let bob = seed_user(&db, "bob", user::Role::User).await;
    let doc_a1 = seed_document(&db, alice.id, "a1.png", 1.0).await;
    let doc_a2 = seed_document(&db, alice.id, "a2.png", 2.0).await;
    let doc_b = seed_document(&db, bob.id, "b.png", 3.0).await;

    let orders = OrderService::new(db.clone());
    let pricing = PricingResolver::new(1.0);
    orders.place_order(alice.id, &doc_a1, &pricing).await.unwrap();
    orders.place_order(alice.id, &doc_a2, &pricing).await.unwrap();
    orders.place_order(bob.id, &doc_b, &pricing).await.unwrap();

    let removed = orders.clear_cart(alice.id).await.unwrap();
    assert_eq!(removed, 2);

    assert_eq!(cart_rows(&db, bob.id, doc_b.id).await, 1);

    // Clearing an already-empty cart removes nothing.
    assert_eq!(orders.clear_cart(alice.id).await.unwrap(), 0);
}

#[tokio::test]
async fn end_to_end_png_example() {
    let db = setup_db().await;
    let alice = seed_user(&db, "alice", user::Role::User).await;
    seed_rule(&db, "png", 1.0).await;
    let doc = seed_document(&db, alice.id, "photo.png", 100.0).await;

    let pricing = PricingResolver::new(7.0);
    let quote = pricing.quote(&db, &doc).await.unwrap();
    assert_eq!(quote.price, 100.0);
    assert!(!quote.fallback);

    let orders = OrderService::new(db.clone());
    let (entry, status) = orders.place_order(alice.id, &doc, &pricing).await.unwrap();
    assert_eq!(status, PlaceOrderStatus::Created);
    assert!(entry.paid);
    assert_eq!(entry.price, 100.0);

    let (again, status) = orders.place_order(alice.id, &doc, &pricing).await.unwrap();
    assert_eq!(status, PlaceOrderStatus::AlreadyPaid);
    assert_eq!(again.price, 100.0);

    let verdict = entitlement::check_entitlement(&db, &auth(&alice), &doc)
        .await
        .unwrap();
    assert_eq!(verdict, Entitlement::Allowed);
}
