//! Database operations for the product catalog.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use japem_core::ProductoId;

use super::{RepositoryError, map_unique_violation};
use crate::models::producto::{CreateProductoInput, Producto};

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductoRow {
    id: i32,
    nombre: String,
    categoria: String,
    unidad_medida: String,
    created_at: DateTime<Utc>,
}

impl From<ProductoRow> for Producto {
    fn from(row: ProductoRow) -> Self {
        Self {
            id: ProductoId::new(row.id),
            nombre: row.nombre,
            categoria: row.categoria,
            unidad_medida: row.unidad_medida,
            created_at: row.created_at,
        }
    }
}

/// Repository for product catalog operations.
pub struct ProductoRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductoRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a catalog product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a product with the same name
    /// (case-insensitive) exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &CreateProductoInput) -> Result<Producto, RepositoryError> {
        let row = sqlx::query_as::<_, ProductoRow>(
            r"
            INSERT INTO japem.producto (nombre, categoria, unidad_medida)
            VALUES ($1, $2, $3)
            RETURNING id, nombre, categoria, unidad_medida, created_at
            ",
        )
        .bind(input.normalized_nombre())
        .bind(input.categoria.trim())
        .bind(input.unidad_medida.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "a product with this name already exists"))?;

        Ok(row.into())
    }

    /// List the catalog ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Producto>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductoRow>(
            r"
            SELECT id, nombre, categoria, unidad_medida, created_at
            FROM japem.producto
            ORDER BY nombre ASC, id ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Get a product by ID within a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_id(
    conn: &mut PgConnection,
    id: ProductoId,
) -> Result<Option<Producto>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductoRow>(
        r"
        SELECT id, nombre, categoria, unidad_medida, created_at
        FROM japem.producto
        WHERE id = $1
        ",
    )
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Resolve a free-text product name to its catalog row.
///
/// Matching ignores case and surrounding/repeated whitespace, mirroring the
/// unique index on `LOWER(BTRIM(nombre))`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_name(
    conn: &mut PgConnection,
    nombre: &str,
) -> Result<Option<Producto>, RepositoryError> {
    let normalized = crate::models::producto::normalize_product_name(nombre);

    let row = sqlx::query_as::<_, ProductoRow>(
        r"
        SELECT id, nombre, categoria, unidad_medida, created_at
        FROM japem.producto
        WHERE LOWER(BTRIM(nombre)) = LOWER($1)
        ",
    )
    .bind(normalized)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}
