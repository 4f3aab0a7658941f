#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use fulfillment_api::entities::{product, user};
use fulfillment_api::events::{process_events, EventSender};
use fulfillment_api::handlers::AppServices;
use fulfillment_api::migrator::Migrator;
use fulfillment_api::services::orders::{CreateOrderRequest, OrderItemRequest};

pub struct TestCtx {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub event_sender: EventSender,
}

pub async fn setup() -> TestCtx {
    setup_with_ttl(Duration::from_secs(24 * 3600)).await
}

pub async fn setup_with_ttl(idempotency_ttl: Duration) -> TestCtx {
    // A single pooled connection keeps every query on the same in-memory
    // sqlite database.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1);

    let db = Database::connect(opt).await.expect("db connect");
    Migrator::up(&db, None).await.expect("migrations");
    let db = Arc::new(db);

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(process_events(rx));
    let event_sender = EventSender::new(tx);
    let services = AppServices::new(db.clone(), event_sender.clone(), idempotency_ttl);

    TestCtx {
        db,
        services,
        event_sender,
    }
}

pub async fn seed_product(db: &DatabaseConnection, stock: i32, price_cents: i64) -> Uuid {
    let id = Uuid::new_v4();
    product::ActiveModel {
        id: Set(id),
        name: Set(format!("Product {}", &id.as_simple().to_string()[..8])),
        sku: Set(format!("SKU-{}", id.as_simple())),
        price_cents: Set(price_cents),
        stock_quantity: Set(stock),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("seed product");
    id
}

pub async fn seed_user(db: &DatabaseConnection, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        email: Set(format!("{}@example.com", id.as_simple())),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed user");
    id
}

pub fn order_request(items: Vec<(Uuid, i32)>) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: "Ada Lovelace".to_string(),
        customer_email: "ada@example.com".to_string(),
        shipping_address: "12 Analytical Way, London".to_string(),
        currency: "USD".to_string(),
        payment_method: Some("card".to_string()),
        items: items
            .into_iter()
            .map(|(product_id, quantity)| OrderItemRequest {
                product_id,
                quantity,
            })
            .collect(),
    }
}
