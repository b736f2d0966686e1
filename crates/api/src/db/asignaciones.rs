//! Database operations for allocations and their lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use japem_core::{
    AsignacionDetalleId, AsignacionEstatus, AsignacionId, IapId, LoteId, UsuarioId,
};

use super::{RepositoryError, clamp_limit};
use crate::models::asignacion::{
    Asignacion, AsignacionConDetalles, AsignacionDetalle, HistorialAsignacion, HistorialFilter,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AsignacionRow {
    id: i32,
    iap_id: i32,
    estatus: AsignacionEstatus,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    entregada_at: Option<DateTime<Utc>>,
}

impl From<AsignacionRow> for Asignacion {
    fn from(row: AsignacionRow) -> Self {
        Self {
            id: AsignacionId::new(row.id),
            iap_id: IapId::new(row.iap_id),
            estatus: row.estatus,
            created_by: row.created_by.map(UsuarioId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
            entregada_at: row.entregada_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AsignacionDetalleRow {
    id: i32,
    asignacion_id: i32,
    inventario_id: i32,
    nombre_producto: String,
    cantidad: Decimal,
    created_at: DateTime<Utc>,
}

impl From<AsignacionDetalleRow> for AsignacionDetalle {
    fn from(row: AsignacionDetalleRow) -> Self {
        Self {
            id: AsignacionDetalleId::new(row.id),
            asignacion_id: AsignacionId::new(row.asignacion_id),
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
    asignacion_id: i32,
    iap_id: i32,
    iap_nombre: String,
    estatus: AsignacionEstatus,
    inventario_id: i32,
    nombre_producto: String,
    cantidad: Decimal,
    created_at: DateTime<Utc>,
}

impl From<HistorialRow> for HistorialAsignacion {
    fn from(row: HistorialRow) -> Self {
        Self {
            detalle_id: AsignacionDetalleId::new(row.detalle_id),
            asignacion_id: AsignacionId::new(row.asignacion_id),
            iap_id: IapId::new(row.iap_id),
            iap_nombre: row.iap_nombre,
            estatus: row.estatus,
            inventario_id: LoteId::new(row.inventario_id),
            nombre_producto: row.nombre_producto,
            cantidad: row.cantidad,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for allocation reads and status changes.
pub struct AsignacionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AsignacionRepository<'a> {
    /// Create a new allocation repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an allocation with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_lines(
        &self,
        id: AsignacionId,
    ) -> Result<Option<AsignacionConDetalles>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_with_lines(&mut conn, id).await
    }

    /// Allocation lines joined with institution name, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(
        &self,
        filter: &HistorialFilter,
    ) -> Result<Vec<HistorialAsignacion>, RepositoryError> {
        let rows = sqlx::query_as::<_, HistorialRow>(
            r"
            SELECT
                d.id AS detalle_id,
                a.id AS asignacion_id,
                i.id AS iap_id,
                i.nombre AS iap_nombre,
                a.estatus,
                d.inventario_id,
                d.nombre_producto,
                d.cantidad,
                d.created_at
            FROM japem.asignacion_detalle d
            INNER JOIN japem.asignacion a ON a.id = d.asignacion_id
            INNER JOIN japem.iap i ON i.id = a.iap_id
            WHERE ($1::int IS NULL OR a.iap_id = $1)
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

    /// Mark a pending allocation as physically delivered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the allocation doesn't exist.
    /// Returns `RepositoryError::Conflict` if it was already delivered.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_delivered(&self, id: AsignacionId) -> Result<Asignacion, RepositoryError> {
        let row = sqlx::query_as::<_, AsignacionRow>(
            r"
            UPDATE japem.asignacion
            SET estatus = 'entregada', entregada_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND estatus = 'pendiente'
            RETURNING id, iap_id, estatus, created_by, created_at, updated_at, entregada_at
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        let exists = sqlx::query_scalar::<_, i32>("SELECT id FROM japem.asignacion WHERE id = $1")
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        match exists {
            Some(_) => Err(RepositoryError::Conflict(format!(
                "allocation {id} was already delivered"
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Insert a pending allocation header.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_header(
    conn: &mut PgConnection,
    iap_id: IapId,
    created_by: Option<UsuarioId>,
) -> Result<Asignacion, RepositoryError> {
    let row = sqlx::query_as::<_, AsignacionRow>(
        r"
        INSERT INTO japem.asignacion (iap_id, created_by)
        VALUES ($1, $2)
        RETURNING id, iap_id, estatus, created_by, created_at, updated_at, entregada_at
        ",
    )
    .bind(iap_id.as_i32())
    .bind(created_by.map(|id| id.as_i32()))
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Insert one allocation line for a lot drawn from.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    asignacion_id: AsignacionId,
    inventario_id: LoteId,
    nombre_producto: &str,
    cantidad: Decimal,
) -> Result<AsignacionDetalle, RepositoryError> {
    let row = sqlx::query_as::<_, AsignacionDetalleRow>(
        r"
        INSERT INTO japem.asignacion_detalle (asignacion_id, inventario_id, nombre_producto, cantidad)
        VALUES ($1, $2, $3, $4)
        RETURNING id, asignacion_id, inventario_id, nombre_producto, cantidad, created_at
        ",
    )
    .bind(asignacion_id.as_i32())
    .bind(inventario_id.as_i32())
    .bind(nombre_producto)
    .bind(cantidad)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Load an allocation header and its lines on one connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn load_with_lines(
    conn: &mut PgConnection,
    id: AsignacionId,
) -> Result<Option<AsignacionConDetalles>, RepositoryError> {
    let header = sqlx::query_as::<_, AsignacionRow>(
        r"
        SELECT id, iap_id, estatus, created_by, created_at, updated_at, entregada_at
        FROM japem.asignacion
        WHERE id = $1
        ",
    )
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };

    let lines = sqlx::query_as::<_, AsignacionDetalleRow>(
        r"
        SELECT id, asignacion_id, inventario_id, nombre_producto, cantidad, created_at
        FROM japem.asignacion_detalle
        WHERE asignacion_id = $1
        ORDER BY id ASC
        ",
    )
    .bind(id.as_i32())
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(AsignacionConDetalles {
        asignacion: header.into(),
        detalles: lines.into_iter().map(Into::into).collect(),
    }))
}
