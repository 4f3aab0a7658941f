pub mod movement_type;
pub mod order_status;

pub use movement_type::MovementType;
pub use order_status::{is_valid_transition, OrderStatus};
