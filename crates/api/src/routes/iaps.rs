//! Beneficiary institution route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use japem_core::IapId;

use crate::{
    db::{IapRepository, RepositoryError},
    error::AppError,
    middleware::{RequireAuth, RequireWriter, ValidatedJson},
    models::{CreateIapInput, Iap, IapFilter, UpdateIapInput},
    services::{StockError, matcher},
    state::AppState,
};

/// Query parameters for suggestions.
#[derive(Debug, Deserialize)]
pub struct SugerenciasQuery {
    pub producto: Option<String>,
}

/// `GET /iaps/sugerencias?producto=` - up to five ranked active institutions.
#[instrument(skip(_ctx, state))]
pub async fn suggestions(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<SugerenciasQuery>,
) -> Result<Json<Vec<Iap>>, AppError> {
    let producto = query.producto.unwrap_or_default();
    Ok(Json(matcher::suggest(state.pool(), &producto).await?))
}

/// `POST /iaps`
#[instrument(skip(ctx, state, input), fields(usuario_id = %ctx.usuario_id))]
pub async fn create(
    RequireWriter(ctx): RequireWriter,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateIapInput>,
) -> Result<(StatusCode, Json<Iap>), AppError> {
    let iap = IapRepository::new(state.pool()).create(&input).await?;
    tracing::info!(iap_id = %iap.id, nombre = %iap.nombre, "Institution registered");
    Ok((StatusCode::CREATED, Json(iap)))
}

/// `GET /iaps`
#[instrument(skip(_ctx, state))]
pub async fn list(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Query(filter): Query<IapFilter>,
) -> Result<Json<Vec<Iap>>, AppError> {
    Ok(Json(IapRepository::new(state.pool()).list(&filter).await?))
}

/// `GET /iaps/{id}`
#[instrument(skip(_ctx, state))]
pub async fn get(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<IapId>,
) -> Result<Json<Iap>, AppError> {
    IapRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| StockError::InstitutionNotFound(id).into())
}

/// `PUT /iaps/{id}` - partial update; `veces_donado` is not writable.
#[instrument(skip(ctx, state, input), fields(usuario_id = %ctx.usuario_id))]
pub async fn update(
    RequireWriter(ctx): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<IapId>,
    ValidatedJson(input): ValidatedJson<UpdateIapInput>,
) -> Result<Json<Iap>, AppError> {
    let iap = IapRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => StockError::InstitutionNotFound(id).into(),
            other => AppError::from(other),
        })?;
    Ok(Json(iap))
}
