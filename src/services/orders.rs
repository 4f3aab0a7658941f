use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{order, order_item, order_status_history, product},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{is_valid_transition, OrderStatus},
    services::idempotency::IdempotencyService,
    services::inventory,
};

/// Attempts per unit of work when a conditional update loses a race.
const MAX_TXN_RETRIES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Customer email must be valid"))]
    pub customer_email: String,
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,
    pub payment_method: Option<String>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<OrderItemRequest>,
}

/// The response replayed verbatim for retried idempotency keys.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cents: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub payment_method: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusHistoryEntry {
    pub from_status: Option<String>,
    pub status: String,
    pub changed_at: DateTime<Utc>,
}

/// Order lifecycle controller: creation behind the idempotency guard, the
/// status state machine, and compensating stock restoration on cancellation.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    idempotency: Arc<IdempotencyService>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        idempotency: Arc<IdempotencyService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            idempotency,
        }
    }

    /// Creates an order with stock deducted at creation time, wrapped in the
    /// idempotency guard: retried submissions with the same key replay the
    /// original response and deduct nothing.
    #[instrument(skip(self, request), fields(idempotency_key = %idempotency_key))]
    pub async fn create_order(
        &self,
        idempotency_key: &str,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ServiceError> {
        self.idempotency
            .execute_idempotent(idempotency_key, || self.create_order_once(&request))
            .await
    }

    /// First execution path for a fresh idempotency key. Payload validation
    /// runs here, behind the guard, so a retried live key replays its stored
    /// response even when the retry's body is malformed. Retries the whole
    /// transaction a bounded number of times when a stock race aborts it.
    async fn create_order_once(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ServiceError> {
        request.validate()?;
        if let Some(bad) = request.items.iter().find(|item| item.quantity <= 0) {
            return Err(ServiceError::ValidationError(format!(
                "quantity for product {} must be a positive integer",
                bad.product_id
            )));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            let txn = self.db.begin().await?;
            match self.try_create_order(&txn, request).await {
                Ok(response) => {
                    txn.commit().await?;

                    info!(order_id = %response.order_id, total_cents = response.total_cents, "Order created");
                    if let Err(e) = self
                        .event_sender
                        .send(Event::OrderCreated(response.order_id))
                        .await
                    {
                        warn!(error = %e, order_id = %response.order_id, "Failed to send order created event");
                    }

                    return Ok(response);
                }
                Err(ServiceError::ConcurrentModification(product_id))
                    if attempt < MAX_TXN_RETRIES =>
                {
                    txn.rollback().await.ok();
                    warn!(%product_id, attempt, "Stock race during order creation, retrying");
                }
                Err(e) => {
                    txn.rollback().await.ok();
                    return Err(e);
                }
            }
        }
    }

    /// One all-or-nothing attempt: order + items + creation history entry +
    /// one SALE movement per item. Any `InsufficientStock` aborts the whole
    /// transaction, so partial orders never exist.
    async fn try_create_order(
        &self,
        txn: &DatabaseTransaction,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ServiceError> {
        let order_id = Uuid::new_v4();
        let now = Utc::now();

        // Price snapshots are read inside the same transaction that deducts
        // stock; they are never re-read from the catalog afterwards.
        let mut total_cents: i64 = 0;
        let mut priced_items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = product::Entity::find_by_id(item.product_id)
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            total_cents += product.price_cents * i64::from(item.quantity);
            priced_items.push((item.product_id, item.quantity, product.price_cents));
        }

        let order_number = format!(
            "ORD-{}",
            order_id.as_simple().to_string()[..8].to_uppercase()
        );
        order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            status: Set(OrderStatus::Pending.to_string()),
            total_cents: Set(total_cents),
            currency: Set(request.currency.clone()),
            customer_name: Set(request.customer_name.clone()),
            customer_email: Set(request.customer_email.clone()),
            shipping_address: Set(request.shipping_address.clone()),
            payment_method: Set(request.payment_method.clone()),
            assigned_to_user_id: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        }
        .insert(txn)
        .await?;

        for (product_id, quantity, unit_cents) in &priced_items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(*product_id),
                quantity: Set(*quantity),
                unit_cents: Set(*unit_cents),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(None),
            status: Set(OrderStatus::Pending.to_string()),
            changed_at: Set(now),
        }
        .insert(txn)
        .await?;

        for (product_id, quantity, _) in &priced_items {
            inventory::apply_movement(
                txn,
                &inventory::NewMovement::sale(*product_id, order_id, *quantity),
            )
            .await?;
        }

        Ok(CreateOrderResponse {
            order_id,
            status: OrderStatus::Pending,
            total_cents,
        })
    }

    /// Moves an order to `new_status` if the state machine allows it. A
    /// same-status request is a no-op success; an invalid transition fails
    /// with `InvalidTransition` and changes nothing. Transitions to
    /// `CANCELLED` restore each item's stock in the same transaction.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn transition_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let txn = self.db.begin().await?;
            match self.try_transition(&txn, order_id, new_status).await {
                Ok((response, old_status, changed)) => {
                    txn.commit().await?;

                    if changed {
                        info!(
                            order_id = %order_id,
                            old_status = %old_status,
                            new_status = %new_status,
                            "Order status updated"
                        );
                        if let Err(e) = self
                            .event_sender
                            .send(Event::OrderStatusChanged {
                                order_id,
                                old_status: old_status.to_string(),
                                new_status: new_status.to_string(),
                            })
                            .await
                        {
                            warn!(error = %e, order_id = %order_id, "Failed to send status change event");
                        }
                        if new_status == OrderStatus::Cancelled {
                            if let Err(e) =
                                self.event_sender.send(Event::OrderCancelled(order_id)).await
                            {
                                warn!(error = %e, order_id = %order_id, "Failed to send cancellation event");
                            }
                        }
                    }

                    return Ok(response);
                }
                Err(ServiceError::ConcurrentModification(id)) if attempt < MAX_TXN_RETRIES => {
                    txn.rollback().await.ok();
                    warn!(entity_id = %id, attempt, "Conflicting update during status transition, retrying");
                }
                Err(e) => {
                    txn.rollback().await.ok();
                    return Err(e);
                }
            }
        }
    }

    async fn try_transition(
        &self,
        txn: &DatabaseTransaction,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<(OrderResponse, OrderStatus, bool), ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let current = OrderStatus::from_str(&order.status).map_err(|_| {
            ServiceError::InternalError(format!(
                "order {} carries unknown status '{}'",
                order_id, order.status
            ))
        })?;

        if current == new_status {
            let response = self.to_response(txn, order).await?;
            return Ok((response, current, false));
        }

        if !is_valid_transition(current, new_status) {
            return Err(ServiceError::InvalidTransition(format!(
                "cannot transition order {} from {} to {}",
                order_id, current, new_status
            )));
        }

        let now = Utc::now();

        // Guarded by the version column so concurrent transitions cannot
        // both apply against the same starting state.
        let update = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(new_status.to_string()))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .col_expr(order::Column::Version, Expr::value(order.version + 1))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(order.version))
            .exec(txn)
            .await?;
        if update.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(order_id));
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(Some(current.to_string())),
            status: Set(new_status.to_string()),
            changed_at: Set(now),
        }
        .insert(txn)
        .await?;

        // Cancellation compensates every SALE with one RESTORE per item.
        // Valid transitions into CANCELLED only exist from non-terminal
        // statuses, which all hold deducted stock.
        if new_status == OrderStatus::Cancelled {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(txn)
                .await?;
            for item in &items {
                inventory::apply_movement(
                    txn,
                    &inventory::NewMovement::restore(item.product_id, order_id, item.quantity),
                )
                .await?;
            }
        }

        let updated = order::Entity::find_by_id(order_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let response = self.to_response(txn, updated).await?;
        Ok((response, current, true))
    }

    /// Retrieves an order with its items.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        self.to_response(&*self.db, order).await
    }

    /// The order's status history, oldest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_status_history(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntry>, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let rows = order_status_history::Entity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::ChangedAt)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| StatusHistoryEntry {
                from_status: row.from_status,
                status: row.status,
                changed_at: row.changed_at,
            })
            .collect())
    }

    async fn to_response<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        model: order::Model,
    ) -> Result<OrderResponse, ServiceError> {
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(model.id))
            .all(conn)
            .await?;

        let status = OrderStatus::from_str(&model.status).map_err(|_| {
            ServiceError::InternalError(format!(
                "order {} carries unknown status '{}'",
                model.id, model.status
            ))
        })?;

        Ok(OrderResponse {
            id: model.id,
            order_number: model.order_number,
            status,
            total_cents: model.total_cents,
            currency: model.currency,
            customer_name: model.customer_name,
            customer_email: model.customer_email,
            shipping_address: model.shipping_address,
            payment_method: model.payment_method,
            items: items
                .into_iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_cents: item.unit_cents,
                })
                .collect(),
            created_at: model.created_at,
            updated_at: model.updated_at,
            version: model.version,
        })
    }
}
