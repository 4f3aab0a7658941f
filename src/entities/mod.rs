pub mod idempotency_key;
pub mod inventory_movement;
pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod product;
pub mod user;
