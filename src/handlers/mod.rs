use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::events::EventSender;
use crate::services::{
    audit::AuditService, idempotency::IdempotencyService, inventory::InventoryService,
    orders::OrderService, stock_adjustments::StockAdjustmentService,
};

pub mod health;
pub mod inventory;
pub mod orders;

/// The services HTTP handlers dispatch into.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub inventory: Arc<InventoryService>,
    pub idempotency: Arc<IdempotencyService>,
    pub stock_adjustments: Arc<StockAdjustmentService>,
    pub audit: Arc<AuditService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        idempotency_ttl: Duration,
    ) -> Self {
        let idempotency = Arc::new(IdempotencyService::new(db.clone(), idempotency_ttl));
        let inventory = Arc::new(InventoryService::new(db.clone(), event_sender.clone()));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            event_sender,
            idempotency.clone(),
        ));
        let stock_adjustments = Arc::new(StockAdjustmentService::new(inventory.clone()));
        let audit = Arc::new(AuditService::new(db));

        Self {
            orders,
            inventory,
            idempotency,
            stock_adjustments,
            audit,
        }
    }
}
