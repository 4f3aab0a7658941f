use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Cause of a stock movement. Validation differs per variant: manual
/// adjustments require a reason and an actor, system movements do not.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Stock deducted by order creation.
    Sale,
    /// Compensating movement reversing a SALE when an order is cancelled.
    Restore,
    /// Manual correction by an operator, always with a reason.
    Adjustment,
}
