//! Product catalog route handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use crate::{
    db::ProductoRepository,
    error::AppError,
    middleware::{RequireAuth, RequireWriter, ValidatedJson},
    models::{CreateProductoInput, Producto},
    state::AppState,
};

/// `POST /productos` - register a catalog product.
#[instrument(skip(ctx, state, input), fields(usuario_id = %ctx.usuario_id))]
pub async fn create(
    RequireWriter(ctx): RequireWriter,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateProductoInput>,
) -> Result<(StatusCode, Json<Producto>), AppError> {
    let producto = ProductoRepository::new(state.pool()).create(&input).await?;
    tracing::info!(producto_id = %producto.id, nombre = %producto.nombre, "Product registered");
    Ok((StatusCode::CREATED, Json(producto)))
}

/// `GET /productos`
#[instrument(skip(_ctx, state))]
pub async fn list(
    RequireAuth(_ctx): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Producto>>, AppError> {
    Ok(Json(ProductoRepository::new(state.pool()).list().await?))
}
