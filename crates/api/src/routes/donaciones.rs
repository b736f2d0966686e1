//! Donation route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use japem_core::DonacionId;

use crate::{
    db::DonacionRepository,
    error::AppError,
    middleware::{RequireAuth, RequireWriter, ValidatedJson},
    models::{CreateDonacionInput, DonacionConLotes},
    services::RecordingService,
    state::AppState,
};

/// `POST /donaciones` - record a donation and create its lots.
#[instrument(skip(ctx, state, input), fields(usuario_id = %ctx.usuario_id))]
pub async fn create(
    RequireWriter(ctx): RequireWriter,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateDonacionInput>,
) -> Result<(StatusCode, Json<DonacionConLotes>), AppError> {
    let donacion = RecordingService::new(state.pool())
        .record_donacion(&ctx, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(donacion)))
}

/// `GET /donaciones/{id}`
#[instrument(skip(_ctx, state))]
pub async fn get(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DonacionId>,
) -> Result<Json<DonacionConLotes>, AppError> {
    DonacionRepository::new(state.pool())
        .get_with_lots(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("donation {id} not found")))
}
