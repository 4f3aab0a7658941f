use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{inventory_movement, product},
    errors::ServiceError,
    events::{Event, EventSender},
    models::MovementType,
};

/// Attempts per movement when the conditional stock update loses a race.
const MAX_STOCK_RETRIES: usize = 3;

/// A movement to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity_delta: i32,
    pub reference: Option<String>,
    pub order_id: Option<Uuid>,
    pub performed_by_user_id: Option<Uuid>,
}

impl NewMovement {
    /// Stock deduction for one order line.
    pub fn sale(product_id: Uuid, order_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id,
            movement_type: MovementType::Sale,
            quantity_delta: -quantity,
            reference: None,
            order_id: Some(order_id),
            performed_by_user_id: None,
        }
    }

    /// Compensating restoration for one order line of a cancelled order.
    pub fn restore(product_id: Uuid, order_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id,
            movement_type: MovementType::Restore,
            quantity_delta: quantity,
            reference: None,
            order_id: Some(order_id),
            performed_by_user_id: None,
        }
    }

    /// Manual correction by an operator.
    pub fn adjustment(
        product_id: Uuid,
        quantity_delta: i32,
        reference: &str,
        performed_by_user_id: Uuid,
    ) -> Self {
        Self {
            product_id,
            movement_type: MovementType::Adjustment,
            quantity_delta,
            reference: Some(reference.to_string()),
            order_id: None,
            performed_by_user_id: Some(performed_by_user_id),
        }
    }

    /// Per-variant validation: a zero delta is never a movement, and manual
    /// adjustments must carry a non-blank reason and an actor.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.quantity_delta == 0 {
            return Err(ServiceError::ValidationError(
                "quantity delta must not be zero".to_string(),
            ));
        }

        if self.movement_type == MovementType::Adjustment {
            let has_reason = self
                .reference
                .as_deref()
                .map(|r| !r.trim().is_empty())
                .unwrap_or(false);
            if !has_reason {
                return Err(ServiceError::ValidationError(
                    "adjustments require a non-empty reason".to_string(),
                ));
            }
            if self.performed_by_user_id.is_none() {
                return Err(ServiceError::ValidationError(
                    "adjustments require a performing user".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Appends one movement and updates the denormalized stock cache within the
/// caller's transaction. This is the single choke point for all stock
/// mutation; no other code path writes `products.stock_quantity`.
///
/// The stock update is conditional on the value read in this transaction
/// (`WHERE stock_quantity = stock_before`); zero rows affected means a
/// concurrent writer won and the caller must retry the whole unit of work.
pub(crate) async fn apply_movement<C: ConnectionTrait>(
    conn: &C,
    movement: &NewMovement,
) -> Result<inventory_movement::Model, ServiceError> {
    movement.validate()?;

    let product = product::Entity::find_by_id(movement.product_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} not found", movement.product_id))
        })?;

    let stock_before = product.stock_quantity;
    let stock_after = stock_before
        .checked_add(movement.quantity_delta)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "quantity delta {} overflows stock level {} for product {}",
                movement.quantity_delta, stock_before, movement.product_id
            ))
        })?;
    if stock_after < 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "product {} has {} in stock, movement of {} would leave {}",
            movement.product_id, stock_before, movement.quantity_delta, stock_after
        )));
    }

    let now = Utc::now();
    let update = product::Entity::update_many()
        .col_expr(product::Column::StockQuantity, Expr::value(stock_after))
        .col_expr(product::Column::UpdatedAt, Expr::value(now))
        .filter(product::Column::Id.eq(movement.product_id))
        .filter(product::Column::StockQuantity.eq(stock_before))
        .exec(conn)
        .await?;

    if update.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(movement.product_id));
    }

    let row = inventory_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(movement.product_id),
        order_id: Set(movement.order_id),
        movement_type: Set(movement.movement_type.to_string()),
        quantity_delta: Set(movement.quantity_delta),
        reference: Set(movement.reference.as_deref().map(|r| r.trim().to_string())),
        performed_by_user_id: Set(movement.performed_by_user_id),
        stock_before: Set(stock_before),
        stock_after: Set(stock_after),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;

    Ok(row)
}

/// The inventory ledger: append-only movement records plus the denormalized
/// current-stock cache on the product row.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Records a standalone movement in its own transaction, retrying a
    /// bounded number of times when a concurrent writer invalidates the
    /// optimistic stock check. `InsufficientStock` is a terminal business
    /// outcome and is never retried.
    #[instrument(skip(self), fields(product_id = %movement.product_id, movement_type = %movement.movement_type))]
    pub async fn record_movement(
        &self,
        movement: NewMovement,
    ) -> Result<inventory_movement::Model, ServiceError> {
        movement.validate()?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let txn = self.db.begin().await?;
            match apply_movement(&txn, &movement).await {
                Ok(row) => {
                    txn.commit().await?;

                    if let Err(e) = self
                        .event_sender
                        .send(Event::StockMovementRecorded {
                            product_id: row.product_id,
                            movement_type: row.movement_type.clone(),
                            quantity_delta: row.quantity_delta,
                            stock_after: row.stock_after,
                        })
                        .await
                    {
                        warn!(error = %e, product_id = %row.product_id, "Failed to send stock movement event");
                    }

                    return Ok(row);
                }
                Err(ServiceError::ConcurrentModification(product_id))
                    if attempt < MAX_STOCK_RETRIES =>
                {
                    txn.rollback().await.ok();
                    warn!(
                        %product_id,
                        attempt, "Concurrent stock update detected, retrying movement"
                    );
                }
                Err(e) => {
                    txn.rollback().await.ok();
                    return Err(e);
                }
            }
        }
    }

    /// Current stock for a product, straight from the denormalized cache.
    #[instrument(skip(self))]
    pub async fn get_stock(&self, product_id: Uuid) -> Result<i32, ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        Ok(product.stock_quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delta_is_rejected() {
        let movement = NewMovement::adjustment(Uuid::new_v4(), 0, "Recount", Uuid::new_v4());
        assert!(matches!(
            movement.validate(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn adjustment_requires_non_blank_reason() {
        let movement = NewMovement::adjustment(Uuid::new_v4(), 5, "   ", Uuid::new_v4());
        assert!(matches!(
            movement.validate(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn adjustment_requires_actor() {
        let mut movement = NewMovement::adjustment(Uuid::new_v4(), 5, "Restock", Uuid::new_v4());
        movement.performed_by_user_id = None;
        assert!(matches!(
            movement.validate(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn system_movements_need_no_reason_or_actor() {
        let sale = NewMovement::sale(Uuid::new_v4(), Uuid::new_v4(), 3);
        assert_eq!(sale.quantity_delta, -3);
        assert!(sale.validate().is_ok());

        let restore = NewMovement::restore(Uuid::new_v4(), Uuid::new_v4(), 3);
        assert_eq!(restore.quantity_delta, 3);
        assert!(restore.validate().is_ok());
    }
}
