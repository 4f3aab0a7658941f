mod common;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use fulfillment_api::entities::{inventory_movement, order, order_status_history};
use fulfillment_api::errors::ServiceError;
use fulfillment_api::models::{is_valid_transition, MovementType, OrderStatus};

use common::{order_request, seed_product, setup};

#[tokio::test]
async fn create_order_deducts_stock_and_snapshots_prices() {
    let ctx = setup().await;
    let product_a = seed_product(&ctx.db, 10, 500).await;
    let product_b = seed_product(&ctx.db, 5, 250).await;

    let response = ctx
        .services
        .orders
        .create_order("key-create-1", order_request(vec![(product_a, 2), (product_b, 3)]))
        .await
        .expect("order should be created");

    assert_eq!(response.status, OrderStatus::Pending);
    assert_eq!(response.total_cents, 2 * 500 + 3 * 250);

    assert_eq!(ctx.services.inventory.get_stock(product_a).await.unwrap(), 8);
    assert_eq!(ctx.services.inventory.get_stock(product_b).await.unwrap(), 2);

    let movements = inventory_movement::Entity::find()
        .filter(inventory_movement::Column::OrderId.eq(response.order_id))
        .all(&*ctx.db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
    for movement in &movements {
        assert_eq!(movement.movement_type, MovementType::Sale.to_string());
        assert_eq!(movement.stock_after, movement.stock_before + movement.quantity_delta);
        assert!(movement.performed_by_user_id.is_none());
    }

    let order = ctx.services.orders.get_order(response.order_id).await.unwrap();
    assert_eq!(order.items.len(), 2);
    let item_a = order.items.iter().find(|i| i.product_id == product_a).unwrap();
    assert_eq!(item_a.unit_cents, 500);
}

#[tokio::test]
async fn insufficient_stock_aborts_the_whole_order() {
    let ctx = setup().await;
    let product_a = seed_product(&ctx.db, 10, 100).await;
    let product_b = seed_product(&ctx.db, 1, 100).await;

    let err = ctx
        .services
        .orders
        .create_order("key-abort-1", order_request(vec![(product_a, 1), (product_b, 5)]))
        .await
        .expect_err("second line exceeds stock");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // No partial orders: nothing persisted, stock untouched.
    assert_eq!(order::Entity::find().count(&*ctx.db).await.unwrap(), 0);
    assert_eq!(
        inventory_movement::Entity::find().count(&*ctx.db).await.unwrap(),
        0
    );
    assert_eq!(ctx.services.inventory.get_stock(product_a).await.unwrap(), 10);
    assert_eq!(ctx.services.inventory.get_stock(product_b).await.unwrap(), 1);
}

#[tokio::test]
async fn unknown_product_fails_with_not_found() {
    let ctx = setup().await;

    let err = ctx
        .services
        .orders
        .create_order("key-missing-1", order_request(vec![(Uuid::new_v4(), 1)]))
        .await
        .expect_err("product does not exist");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn full_lifecycle_appends_valid_history() {
    let ctx = setup().await;
    let product = seed_product(&ctx.db, 10, 100).await;

    let created = ctx
        .services
        .orders
        .create_order("key-lifecycle-1", order_request(vec![(product, 1)]))
        .await
        .unwrap();

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        ctx.services
            .orders
            .transition_status(created.order_id, status)
            .await
            .expect("forward transition");
    }

    let history = ctx
        .services
        .orders
        .get_status_history(created.order_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].from_status, None);
    assert_eq!(history[0].status, "PENDING");
    assert_eq!(history.last().unwrap().status, "DELIVERED");

    // Every consecutive pair is a valid transition and timestamps never go
    // backwards.
    for pair in history.windows(2) {
        let from: OrderStatus = pair[0].status.parse().unwrap();
        let to: OrderStatus = pair[1].status.parse().unwrap();
        assert!(is_valid_transition(from, to), "{from} -> {to}");
        assert!(pair[0].changed_at <= pair[1].changed_at);
    }
}

#[tokio::test]
async fn invalid_transition_is_rejected_without_state_change() {
    let ctx = setup().await;
    let product = seed_product(&ctx.db, 10, 100).await;

    let created = ctx
        .services
        .orders
        .create_order("key-invalid-1", order_request(vec![(product, 1)]))
        .await
        .unwrap();
    for status in [OrderStatus::Shipped, OrderStatus::Delivered] {
        ctx.services
            .orders
            .transition_status(created.order_id, status)
            .await
            .unwrap();
    }

    let err = ctx
        .services
        .orders
        .transition_status(created.order_id, OrderStatus::Processing)
        .await
        .expect_err("DELIVERED is terminal");
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let order = ctx.services.orders.get_order(created.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    let history = ctx
        .services
        .orders
        .get_status_history(created.order_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn same_status_transition_is_a_noop() {
    let ctx = setup().await;
    let product = seed_product(&ctx.db, 10, 100).await;

    let created = ctx
        .services
        .orders
        .create_order("key-noop-1", order_request(vec![(product, 1)]))
        .await
        .unwrap();
    ctx.services
        .orders
        .transition_status(created.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let order = ctx
        .services
        .orders
        .transition_status(created.order_id, OrderStatus::Confirmed)
        .await
        .expect("same-status request is accepted");
    assert_eq!(order.status, OrderStatus::Confirmed);

    let history = ctx
        .services
        .orders
        .get_status_history(created.order_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2, "no-op must not append history");
}

#[tokio::test]
async fn cancellation_restores_stock_with_compensating_movements() {
    let ctx = setup().await;
    let product = seed_product(&ctx.db, 10, 100).await;

    let created = ctx
        .services
        .orders
        .create_order("key-cancel-1", order_request(vec![(product, 2)]))
        .await
        .unwrap();
    assert_eq!(ctx.services.inventory.get_stock(product).await.unwrap(), 8);

    ctx.services
        .orders
        .transition_status(created.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    ctx.services
        .orders
        .transition_status(created.order_id, OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(ctx.services.inventory.get_stock(product).await.unwrap(), 10);

    let restores = inventory_movement::Entity::find()
        .filter(inventory_movement::Column::OrderId.eq(created.order_id))
        .filter(inventory_movement::Column::MovementType.eq(MovementType::Restore.to_string()))
        .all(&*ctx.db)
        .await
        .unwrap();
    assert_eq!(restores.len(), 1, "exactly one RESTORE per order item");
    assert_eq!(restores[0].quantity_delta, 2);
    assert!(restores[0].performed_by_user_id.is_none());
    assert!(restores[0].reference.is_none());
}

#[tokio::test]
async fn cancelled_orders_admit_no_further_transitions() {
    let ctx = setup().await;
    let product = seed_product(&ctx.db, 10, 100).await;

    let created = ctx
        .services
        .orders
        .create_order("key-terminal-1", order_request(vec![(product, 1)]))
        .await
        .unwrap();
    ctx.services
        .orders
        .transition_status(created.order_id, OrderStatus::Cancelled)
        .await
        .unwrap();

    let err = ctx
        .services
        .orders
        .transition_status(created.order_id, OrderStatus::Processing)
        .await
        .expect_err("CANCELLED is terminal");
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    // Cancelling again is a no-op and must not restore stock a second time.
    ctx.services
        .orders
        .transition_status(created.order_id, OrderStatus::Cancelled)
        .await
        .expect("self-transition on terminal status");
    assert_eq!(ctx.services.inventory.get_stock(product).await.unwrap(), 10);

    let restore_count = inventory_movement::Entity::find()
        .filter(inventory_movement::Column::OrderId.eq(created.order_id))
        .filter(inventory_movement::Column::MovementType.eq(MovementType::Restore.to_string()))
        .count(&*ctx.db)
        .await
        .unwrap();
    assert_eq!(restore_count, 1);
}

#[tokio::test]
async fn history_rows_are_ordered_and_attributed() {
    let ctx = setup().await;
    let product = seed_product(&ctx.db, 10, 100).await;

    let created = ctx
        .services
        .orders
        .create_order("key-history-1", order_request(vec![(product, 1)]))
        .await
        .unwrap();
    ctx.services
        .orders
        .transition_status(created.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let rows = order_status_history::Entity::find()
        .filter(order_status_history::Column::OrderId.eq(created.order_id))
        .order_by_asc(order_status_history::Column::ChangedAt)
        .all(&*ctx.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].from_status.as_deref(), Some("PENDING"));
    assert_eq!(rows[1].status, "CONFIRMED");
}
