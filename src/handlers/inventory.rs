use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::MovementType,
    services::audit::MovementFilters,
    services::stock_adjustments::StockAdjustmentResponse,
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    pub quantity_delta: i32,
    pub reference: String,
    pub actor_user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockResponse {
    pub product_id: Uuid,
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovementListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub movement_type: Option<MovementType>,
    pub order_id: Option<Uuid>,
    pub performed_by: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

pub fn inventory_router() -> Router<AppState> {
    Router::new()
        .route("/adjust", post(adjust_stock))
        .route("/:product_id", get(get_stock))
        .route("/:product_id/movements", get(list_movements))
}

/// Manually adjust a product's stock. Requires a reason and an acting user;
/// the ledger's negative-stock check is authoritative regardless of any
/// client-side validation.
#[utoipa::path(
    post,
    path = "/api/v1/inventory/adjust",
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = StockAdjustmentResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state
        .services
        .stock_adjustments
        .adjust_stock(
            payload.product_id,
            payload.quantity_delta,
            &payload.reference,
            payload.actor_user_id,
        )
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{product_id}",
    responses(
        (status = 200, description = "Current stock returned", body = StockResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let stock_quantity = state.services.inventory.get_stock(product_id).await?;
    Ok(Json(ApiResponse::success(StockResponse {
        product_id,
        stock_quantity,
    })))
}

/// Paginated movement audit trail for a product, newest first, joined with
/// the performing user's display identity where one exists.
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{product_id}/movements",
    params(MovementListQuery),
    responses(
        (status = 200, description = "Movement list returned"),
        (status = 400, description = "Invalid pagination", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<MovementListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let filters = MovementFilters {
        movement_type: query.movement_type,
        order_id: query.order_id,
        performed_by: query.performed_by,
    };

    let page = state
        .services
        .audit
        .list_movements(product_id, query.page, query.limit, filters)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}
