use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One signed stock change. Rows are inserted through the ledger choke
/// point and are never edited or deleted afterwards; corrections happen by
/// appending a compensating movement.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    /// Present for SALE/RESTORE, absent for manual ADJUSTMENT.
    pub order_id: Option<Uuid>,
    pub movement_type: String,
    pub quantity_delta: i32,
    pub reference: Option<String>,
    /// Absent for system-generated SALE/RESTORE, required for ADJUSTMENT.
    pub performed_by_user_id: Option<Uuid>,
    pub stock_before: i32,
    pub stock_after: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PerformedByUserId",
        to = "super::user::Column::Id"
    )]
    PerformedBy,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PerformedBy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
