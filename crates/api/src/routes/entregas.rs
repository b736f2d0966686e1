//! Direct delivery route handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::{
    db::EntregaRepository,
    error::AppError,
    middleware::{RequireAuth, RequireWriter, ValidatedJson},
    models::{CreateEntregaInput, EntregaConDetalles, HistorialEntrega, HistorialFilter},
    services::RecordingService,
    state::AppState,
};

/// `POST /entregas` - deliver products (by name) to an institution.
#[instrument(skip(ctx, state, input), fields(usuario_id = %ctx.usuario_id, iap_id = %input.iap_id))]
pub async fn create(
    RequireWriter(ctx): RequireWriter,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateEntregaInput>,
) -> Result<(StatusCode, Json<EntregaConDetalles>), AppError> {
    let entrega = RecordingService::new(state.pool())
        .record_entrega(&ctx, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(entrega)))
}

/// `GET /entregas/historial` - delivery lines, newest first.
#[instrument(skip(_ctx, state))]
pub async fn history(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Query(filter): Query<HistorialFilter>,
) -> Result<Json<Vec<HistorialEntrega>>, AppError> {
    let rows = EntregaRepository::new(state.pool()).history(&filter).await?;
    Ok(Json(rows))
}
