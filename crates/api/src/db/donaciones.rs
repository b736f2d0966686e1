//! Database operations for donations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

use japem_core::{DonacionId, UsuarioId};

use super::RepositoryError;
use super::inventario::lots_for_donation;
use crate::models::donacion::{Donacion, DonacionConLotes};

#[derive(Debug, sqlx::FromRow)]
struct DonacionRow {
    id: i32,
    fecha_donacion: NaiveDate,
    observaciones: Option<String>,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<DonacionRow> for Donacion {
    fn from(row: DonacionRow) -> Self {
        Self {
            id: DonacionId::new(row.id),
            fecha_donacion: row.fecha_donacion,
            observaciones: row.observaciones,
            created_by: row.created_by.map(UsuarioId::new),
            created_at: row.created_at,
        }
    }
}

/// Repository for donation reads.
pub struct DonacionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DonacionRepository<'a> {
    /// Create a new donation repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a donation with the lots it created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_lots(
        &self,
        id: DonacionId,
    ) -> Result<Option<DonacionConLotes>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_with_lots(&mut conn, id).await
    }
}

/// Insert a donation header. A missing date means today.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_donacion(
    conn: &mut PgConnection,
    fecha_donacion: Option<NaiveDate>,
    observaciones: Option<&str>,
    created_by: Option<UsuarioId>,
) -> Result<Donacion, RepositoryError> {
    let row = sqlx::query_as::<_, DonacionRow>(
        r"
        INSERT INTO japem.donacion (fecha_donacion, observaciones, created_by)
        VALUES (COALESCE($1, CURRENT_DATE), $2, $3)
        RETURNING id, fecha_donacion, observaciones, created_by, created_at
        ",
    )
    .bind(fecha_donacion)
    .bind(observaciones.map(str::trim).filter(|s| !s.is_empty()))
    .bind(created_by.map(|id| id.as_i32()))
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Load a donation and its lots on one connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn load_with_lots(
    conn: &mut PgConnection,
    id: DonacionId,
) -> Result<Option<DonacionConLotes>, RepositoryError> {
    let header = sqlx::query_as::<_, DonacionRow>(
        r"
        SELECT id, fecha_donacion, observaciones, created_by, created_at
        FROM japem.donacion
        WHERE id = $1
        ",
    )
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };

    let lotes = lots_for_donation(conn, id).await?;

    Ok(Some(DonacionConLotes {
        donacion: header.into(),
        lotes,
    }))
}
