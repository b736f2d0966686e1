//! Inventory route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use japem_core::LoteId;

use crate::{
    db::InventoryLotRepository,
    error::AppError,
    middleware::RequireAuth,
    models::{InventarioAgregado, InventoryLot, LotFilter},
    state::AppState,
};

/// `GET /inventario` - stock per product over lots that still hold stock.
#[instrument(skip(_ctx, state))]
pub async fn aggregated(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<InventarioAgregado>>, AppError> {
    let rows = InventoryLotRepository::new(state.pool())
        .aggregated_stock()
        .await?;
    Ok(Json(rows))
}

/// `GET /inventario/lotes` - lots in FIFO order.
#[instrument(skip(_ctx, state))]
pub async fn list_lots(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Query(filter): Query<LotFilter>,
) -> Result<Json<Vec<InventoryLot>>, AppError> {
    let lots = InventoryLotRepository::new(state.pool())
        .list_lots(&filter)
        .await?;
    Ok(Json(lots))
}

/// `GET /inventario/lotes/{id}`
#[instrument(skip(_ctx, state))]
pub async fn get_lot(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<LoteId>,
) -> Result<Json<InventoryLot>, AppError> {
    InventoryLotRepository::new(state.pool())
        .get_lot(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("inventory lot {id} not found")))
}
