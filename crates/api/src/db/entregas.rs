//! Database operations for direct deliveries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use japem_core::{EntregaDetalleId, EntregaId, IapId, LoteId, UsuarioId};

use super::{RepositoryError, clamp_limit};
use crate::models::asignacion::HistorialFilter;
use crate::models::entrega::{Entrega, EntregaDetalle, HistorialEntrega};

#[derive(Debug, sqlx::FromRow)]
struct EntregaRow {
    id: i32,
    iap_id: i32,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<EntregaRow> for Entrega {
    fn from(row: EntregaRow) -> Self {
        Self {
            id: EntregaId::new(row.id),
            iap_id: IapId::new(row.iap_id),
            created_by: row.created_by.map(UsuarioId::new),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntregaDetalleRow {
    id: i32,
    entrega_id: i32,
    inventario_id: i32,
    nombre_producto: String,
    cantidad: Decimal,
    created_at: DateTime<Utc>,
}

impl From<EntregaDetalleRow> for EntregaDetalle {
    fn from(row: EntregaDetalleRow) -> Self {
        Self {
            id: EntregaDetalleId::new(row.id),
            entrega_id: EntregaId::new(row.entrega_id),
            inventario_id: LoteId::new(row.inventario_id),
            nombre_producto: row.nombre_producto,
            cantidad: row.cantidad,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistorialRow {
    detalle_id: i32,
    entrega_id: i32,
    iap_id: i32,
    iap_nombre: String,
    inventario_id: i32,
    nombre_producto: String,
    cantidad: Decimal,
    created_at: DateTime<Utc>,
}

impl From<HistorialRow> for HistorialEntrega {
    fn from(row: HistorialRow) -> Self {
        Self {
            detalle_id: EntregaDetalleId::new(row.detalle_id),
            entrega_id: EntregaId::new(row.entrega_id),
            iap_id: IapId::new(row.iap_id),
            iap_nombre: row.iap_nombre,
            inventario_id: LoteId::new(row.inventario_id),
            nombre_producto: row.nombre_producto,
            cantidad: row.cantidad,
            created_at: row.created_at,
        }
    }
}

/// Repository for delivery reads.
pub struct EntregaRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EntregaRepository<'a> {
    /// Create a new delivery repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Delivery lines joined with institution name, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(
        &self,
        filter: &HistorialFilter,
    ) -> Result<Vec<HistorialEntrega>, RepositoryError> {
        let rows = sqlx::query_as::<_, HistorialRow>(
            r"
            SELECT
                d.id AS detalle_id,
                e.id AS entrega_id,
                i.id AS iap_id,
                i.nombre AS iap_nombre,
                d.inventario_id,
                d.nombre_producto,
                d.cantidad,
                d.created_at
            FROM japem.entrega_detalle d
            INNER JOIN japem.entrega e ON e.id = d.entrega_id
            INNER JOIN japem.iap i ON i.id = e.iap_id
            WHERE ($1::int IS NULL OR e.iap_id = $1)
            ORDER BY d.created_at DESC, d.id DESC
            LIMIT $2
            ",
        )
        .bind(filter.iap_id.map(|id| id.as_i32()))
        .bind(clamp_limit(filter.limit))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Insert a delivery header.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_header(
    conn: &mut PgConnection,
    iap_id: IapId,
    created_by: Option<UsuarioId>,
) -> Result<Entrega, RepositoryError> {
    let row = sqlx::query_as::<_, EntregaRow>(
        r"
        INSERT INTO japem.entrega (iap_id, created_by)
        VALUES ($1, $2)
        RETURNING id, iap_id, created_by, created_at
        ",
    )
    .bind(iap_id.as_i32())
    .bind(created_by.map(|id| id.as_i32()))
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Insert one delivery line for a lot drawn from.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    entrega_id: EntregaId,
    inventario_id: LoteId,
    nombre_producto: &str,
    cantidad: Decimal,
) -> Result<EntregaDetalle, RepositoryError> {
    let row = sqlx::query_as::<_, EntregaDetalleRow>(
        r"
        INSERT INTO japem.entrega_detalle (entrega_id, inventario_id, nombre_producto, cantidad)
        VALUES ($1, $2, $3, $4)
        RETURNING id, entrega_id, inventario_id, nombre_producto, cantidad, created_at
        ",
    )
    .bind(entrega_id.as_i32())
    .bind(inventario_id.as_i32())
    .bind(nombre_producto)
    .bind(cantidad)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}
