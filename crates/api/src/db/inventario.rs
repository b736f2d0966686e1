//! Database operations for inventory lots.
//!
//! Lots are consumed oldest-first. The canonical creation order is
//! `created_at ASC, id ASC`; every FIFO query in this module uses it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use japem_core::{DonacionId, LoteId, ProductoId};

use super::{RepositoryError, clamp_limit};
use crate::models::inventario::{InventarioAgregado, InventoryLot, LotFilter};

/// Shared projection for lot queries (lot joined with its catalog product).
macro_rules! lot_select {
    () => {
        r"
        SELECT
            l.id, l.producto_id,
            p.nombre AS nombre_producto, p.categoria, p.unidad_medida,
            l.cantidad, l.cantidad_inicial,
            l.precio_unitario, l.precio_mercado,
            l.fecha_caducidad, l.fecha_recepcion,
            l.donacion_id, l.created_at, l.updated_at
        FROM japem.inventario l
        INNER JOIN japem.producto p ON p.id = l.producto_id
        "
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for inventory lot queries.
#[derive(Debug, sqlx::FromRow)]
struct InventoryLotRow {
    id: i32,
    producto_id: i32,
    nombre_producto: String,
    categoria: String,
    unidad_medida: String,
    cantidad: Decimal,
    cantidad_inicial: Decimal,
    precio_unitario: Option<Decimal>,
    precio_mercado: Option<Decimal>,
    fecha_caducidad: Option<NaiveDate>,
    fecha_recepcion: DateTime<Utc>,
    donacion_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InventoryLotRow> for InventoryLot {
    fn from(row: InventoryLotRow) -> Self {
        Self {
            id: LoteId::new(row.id),
            producto_id: ProductoId::new(row.producto_id),
            nombre_producto: row.nombre_producto,
            categoria: row.categoria,
            unidad_medida: row.unidad_medida,
            cantidad: row.cantidad,
            cantidad_inicial: row.cantidad_inicial,
            precio_unitario: row.precio_unitario,
            precio_mercado: row.precio_mercado,
            fecha_caducidad: row.fecha_caducidad,
            fecha_recepcion: row.fecha_recepcion,
            donacion_id: row.donacion_id.map(DonacionId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for the aggregated stock view.
#[derive(Debug, sqlx::FromRow)]
struct InventarioAgregadoRow {
    producto_id: i32,
    nombre_producto: String,
    categoria: String,
    unidad_medida: String,
    cantidad_total: Decimal,
    lotes: i64,
}

impl From<InventarioAgregadoRow> for InventarioAgregado {
    fn from(row: InventarioAgregadoRow) -> Self {
        Self {
            producto_id: ProductoId::new(row.producto_id),
            nombre_producto: row.nombre_producto,
            categoria: row.categoria,
            unidad_medida: row.unidad_medida,
            cantidad_total: row.cantidad_total,
            lotes: row.lotes,
        }
    }
}

/// A lot row held under `FOR UPDATE` by the current transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedLot {
    /// Lot ID.
    pub id: LoteId,
    /// Quantity available at lock time.
    pub cantidad: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct LockedLotRow {
    id: i32,
    cantidad: Decimal,
}

/// Values for inserting a lot.
#[derive(Debug, Clone)]
pub struct NewLot {
    pub producto_id: ProductoId,
    pub donacion_id: Option<DonacionId>,
    pub cantidad: Decimal,
    pub precio_unitario: Option<Decimal>,
    pub precio_mercado: Option<Decimal>,
    pub fecha_caducidad: Option<NaiveDate>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for inventory lot reads.
pub struct InventoryLotRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryLotRepository<'a> {
    /// Create a new inventory lot repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an inventory lot by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_lot(&self, id: LoteId) -> Result<Option<InventoryLot>, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryLotRow>(concat!(lot_select!(), "WHERE l.id = $1"))
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// List inventory lots in FIFO order with filtering.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_lots(
        &self,
        filter: &LotFilter,
    ) -> Result<Vec<InventoryLot>, RepositoryError> {
        let limit = clamp_limit(filter.limit);
        let offset = filter.offset.unwrap_or(0).max(0);

        let rows = sqlx::query_as::<_, InventoryLotRow>(concat!(
            lot_select!(),
            r"
            WHERE
                ($1::int IS NULL OR l.producto_id = $1)
                AND ($2::bool IS NULL OR NOT $2 OR l.cantidad > 0)
            ORDER BY l.created_at ASC, l.id ASC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(filter.producto_id.map(|id| id.as_i32()))
        .bind(filter.con_existencia)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Aggregated stock per product over lots with remaining quantity.
    ///
    /// Products whose lots are all exhausted are omitted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn aggregated_stock(&self) -> Result<Vec<InventarioAgregado>, RepositoryError> {
        let rows = sqlx::query_as::<_, InventarioAgregadoRow>(
            r"
            SELECT
                p.id AS producto_id,
                p.nombre AS nombre_producto,
                p.categoria,
                p.unidad_medida,
                SUM(l.cantidad) AS cantidad_total,
                COUNT(l.id) AS lotes
            FROM japem.inventario l
            INNER JOIN japem.producto p ON p.id = l.producto_id
            WHERE l.cantidad > 0
            GROUP BY p.id, p.nombre, p.categoria, p.unidad_medida
            HAVING SUM(l.cantidad) > 0
            ORDER BY p.nombre ASC, p.id ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Lock every lot of a product that still has stock, oldest first.
///
/// The rows stay locked until the caller's transaction commits or rolls back,
/// so a concurrent allocation for the same product waits here and then sees
/// the decremented quantities.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_available_for_product(
    conn: &mut PgConnection,
    producto_id: ProductoId,
) -> Result<Vec<LockedLot>, RepositoryError> {
    let rows = sqlx::query_as::<_, LockedLotRow>(
        r"
        SELECT id, cantidad
        FROM japem.inventario
        WHERE producto_id = $1 AND cantidad > 0
        ORDER BY created_at ASC, id ASC
        FOR UPDATE
        ",
    )
    .bind(producto_id.as_i32())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| LockedLot {
            id: LoteId::new(row.id),
            cantidad: row.cantidad,
        })
        .collect())
}

/// Subtract `cantidad` from a lot.
///
/// The update only applies while the lot still holds at least `cantidad`, so
/// the stored quantity can never go negative.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the lot no longer holds enough stock.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn decrement(
    conn: &mut PgConnection,
    id: LoteId,
    cantidad: Decimal,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE japem.inventario
        SET cantidad = cantidad - $2, updated_at = NOW()
        WHERE id = $1 AND cantidad >= $2
        ",
    )
    .bind(id.as_i32())
    .bind(cantidad)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        Ok(())
    } else {
        Err(RepositoryError::Conflict(format!(
            "lot {id} no longer holds {cantidad}"
        )))
    }
}

/// Find the catalog product a lot belongs to.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn product_of_lot(
    conn: &mut PgConnection,
    id: LoteId,
) -> Result<Option<ProductoId>, RepositoryError> {
    let producto_id = sqlx::query_scalar::<_, i32>(
        r"
        SELECT producto_id FROM japem.inventario WHERE id = $1
        ",
    )
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(producto_id.map(ProductoId::new))
}

/// Insert a new lot with its full quantity available.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails (including an
/// unknown `producto_id`).
pub async fn insert_lot(conn: &mut PgConnection, lot: &NewLot) -> Result<LoteId, RepositoryError> {
    let id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO japem.inventario (
            producto_id, donacion_id, cantidad, cantidad_inicial,
            precio_unitario, precio_mercado, fecha_caducidad
        )
        VALUES ($1, $2, $3, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(lot.producto_id.as_i32())
    .bind(lot.donacion_id.map(|id| id.as_i32()))
    .bind(lot.cantidad)
    .bind(lot.precio_unitario)
    .bind(lot.precio_mercado)
    .bind(lot.fecha_caducidad)
    .fetch_one(&mut *conn)
    .await?;

    Ok(LoteId::new(id))
}

/// Lots created by a donation, in creation order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lots_for_donation(
    conn: &mut PgConnection,
    donacion_id: DonacionId,
) -> Result<Vec<InventoryLot>, RepositoryError> {
    let rows = sqlx::query_as::<_, InventoryLotRow>(concat!(
        lot_select!(),
        "WHERE l.donacion_id = $1 ORDER BY l.created_at ASC, l.id ASC"
    ))
    .bind(donacion_id.as_i32())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}
