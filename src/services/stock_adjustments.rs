use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::inventory::{InventoryService, NewMovement},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockAdjustmentResponse {
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub stock_quantity: i32,
}

/// Admin-facing facade over the inventory ledger. The only path by which a
/// human directly changes stock outside order processing, and it always
/// requires a reason. The ledger's negative-stock check still applies even
/// when a client pre-validated.
#[derive(Clone)]
pub struct StockAdjustmentService {
    inventory: Arc<InventoryService>,
}

impl StockAdjustmentService {
    pub fn new(inventory: Arc<InventoryService>) -> Self {
        Self { inventory }
    }

    #[instrument(skip(self, reference), fields(product_id = %product_id, quantity_delta))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        quantity_delta: i32,
        reference: &str,
        actor_user_id: Uuid,
    ) -> Result<StockAdjustmentResponse, ServiceError> {
        if quantity_delta == 0 {
            return Err(ServiceError::ValidationError(
                "quantity delta must not be zero".to_string(),
            ));
        }
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ServiceError::ValidationError(
                "adjustments require a non-empty reason".to_string(),
            ));
        }

        let movement = self
            .inventory
            .record_movement(NewMovement::adjustment(
                product_id,
                quantity_delta,
                reference,
                actor_user_id,
            ))
            .await?;

        info!(
            product_id = %product_id,
            actor = %actor_user_id,
            stock_after = movement.stock_after,
            "Manual stock adjustment recorded"
        );

        Ok(StockAdjustmentResponse {
            movement_id: movement.id,
            product_id,
            stock_quantity: movement.stock_after,
        })
    }
}
