use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied checkout token. The primary key uniqueness is the
/// synchronization primitive that resolves concurrent duplicate submissions
/// to exactly one winner. `response_snapshot` is null while the wrapped
/// operation is still in flight.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "idempotency_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub order_id: Option<Uuid>,
    #[sea_orm(column_type = "Json", nullable)]
    pub response_snapshot: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
