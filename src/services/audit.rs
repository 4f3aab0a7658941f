use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    entities::{inventory_movement, product, user},
    errors::ServiceError,
    models::MovementType,
    PaginatedResponse,
};

const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct MovementFilters {
    pub movement_type: Option<MovementType>,
    pub order_id: Option<Uuid>,
    pub performed_by: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActorInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovementWithActor {
    pub id: Uuid,
    pub product_id: Uuid,
    pub order_id: Option<Uuid>,
    pub movement_type: String,
    pub quantity_delta: i32,
    pub reference: Option<String>,
    pub stock_before: i32,
    pub stock_after: i32,
    pub created_at: DateTime<Utc>,
    /// Absent for system-generated SALE/RESTORE movements.
    pub performed_by: Option<ActorInfo>,
}

/// Read-only view over the movement ledger joined with actor identity.
#[derive(Clone)]
pub struct AuditService {
    db: Arc<DatabaseConnection>,
}

impl AuditService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists a product's movements, newest first, with optional filtering.
    #[instrument(skip(self), fields(product_id = %product_id, page, limit))]
    pub async fn list_movements(
        &self,
        product_id: Uuid,
        page: u64,
        limit: u64,
        filters: MovementFilters,
    ) -> Result<PaginatedResponse<MovementWithActor>, ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "page numbering starts at 1".to_string(),
            ));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ServiceError::ValidationError(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let db = &*self.db;

        product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut query = inventory_movement::Entity::find()
            .filter(inventory_movement::Column::ProductId.eq(product_id));

        if let Some(movement_type) = filters.movement_type {
            query = query
                .filter(inventory_movement::Column::MovementType.eq(movement_type.to_string()));
        }
        if let Some(order_id) = filters.order_id {
            query = query.filter(inventory_movement::Column::OrderId.eq(order_id));
        }
        if let Some(performed_by) = filters.performed_by {
            query =
                query.filter(inventory_movement::Column::PerformedByUserId.eq(performed_by));
        }

        let paginator = query
            .order_by_desc(inventory_movement::Column::CreatedAt)
            .find_also_related(user::Entity)
            .paginate(db, limit);

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let items = rows
            .into_iter()
            .map(|(movement, actor)| MovementWithActor {
                id: movement.id,
                product_id: movement.product_id,
                order_id: movement.order_id,
                movement_type: movement.movement_type,
                quantity_delta: movement.quantity_delta,
                reference: movement.reference,
                stock_before: movement.stock_before,
                stock_after: movement.stock_after,
                created_at: movement.created_at,
                performed_by: actor.map(|u| ActorInfo {
                    id: u.id,
                    name: u.name,
                    email: u.email,
                }),
            })
            .collect::<Vec<_>>();

        Ok(PaginatedResponse {
            items,
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        })
    }
}
