pub mod audit;
pub mod idempotency;
pub mod inventory;
pub mod orders;
pub mod stock_adjustments;
