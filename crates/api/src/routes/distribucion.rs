//! Allocation (distribución) route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use japem_core::AsignacionId;

use crate::{
    db::{AsignacionRepository, RepositoryError},
    error::AppError,
    middleware::{RequireAuth, RequireWriter, ValidatedJson},
    models::{
        Asignacion, AsignacionConDetalles, CreateAsignacionInput, HistorialAsignacion,
        HistorialFilter,
    },
    services::{RecordingService, StockError},
    state::AppState,
};

/// `POST /distribucion` - allocate stock to an institution (FIFO per product).
#[instrument(skip(ctx, state, input), fields(usuario_id = %ctx.usuario_id, iap_id = %input.iap_id))]
pub async fn create(
    RequireWriter(ctx): RequireWriter,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateAsignacionInput>,
) -> Result<(StatusCode, Json<AsignacionConDetalles>), AppError> {
    let asignacion = RecordingService::new(state.pool())
        .record_asignacion(&ctx, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(asignacion)))
}

/// `GET /distribucion/historial` - allocation lines, newest first.
#[instrument(skip(_ctx, state))]
pub async fn history(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Query(filter): Query<HistorialFilter>,
) -> Result<Json<Vec<HistorialAsignacion>>, AppError> {
    let rows = AsignacionRepository::new(state.pool())
        .history(&filter)
        .await?;
    Ok(Json(rows))
}

/// `GET /distribucion/{id}`
#[instrument(skip(_ctx, state))]
pub async fn get(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AsignacionId>,
) -> Result<Json<AsignacionConDetalles>, AppError> {
    AsignacionRepository::new(state.pool())
        .get_with_lines(id)
        .await?
        .map(Json)
        .ok_or_else(|| StockError::AllocationNotFound(id).into())
}

/// `POST /distribucion/{id}/entregar` - mark a pending allocation as handed over.
///
/// Stock and `veces_donado` were already settled when the allocation was
/// recorded; this only changes the status.
#[instrument(skip(ctx, state), fields(usuario_id = %ctx.usuario_id))]
pub async fn mark_delivered(
    RequireWriter(ctx): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<AsignacionId>,
) -> Result<Json<Asignacion>, AppError> {
    let asignacion = AsignacionRepository::new(state.pool())
        .mark_delivered(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => StockError::AllocationNotFound(id).into(),
            other => AppError::from(other),
        })?;
    tracing::info!(asignacion_id = %id, "Allocation delivered");
    Ok(Json(asignacion))
}
