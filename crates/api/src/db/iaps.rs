//! Database operations for beneficiary institutions (IAPs).

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use japem_core::{IapEstatus, IapId};

use super::RepositoryError;
use crate::models::iap::{CreateIapInput, Iap, IapFilter, UpdateIapInput};

macro_rules! iap_columns {
    () => {
        r"
        id, nombre, estatus, rubro,
        necesidad_primaria, necesidad_complementaria, clasificaciones,
        es_certificada, es_donataria_autorizada, tiene_padron_beneficiarios,
        beneficiarios_directos, beneficiarios_indirectos, veces_donado,
        created_at, updated_at
        "
    };
}

/// Internal row type for institution queries.
#[derive(Debug, sqlx::FromRow)]
struct IapRow {
    id: i32,
    nombre: String,
    estatus: IapEstatus,
    rubro: Option<String>,
    necesidad_primaria: Option<String>,
    necesidad_complementaria: Option<String>,
    clasificaciones: Vec<String>,
    es_certificada: bool,
    es_donataria_autorizada: bool,
    tiene_padron_beneficiarios: bool,
    beneficiarios_directos: i32,
    beneficiarios_indirectos: i32,
    veces_donado: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IapRow> for Iap {
    fn from(row: IapRow) -> Self {
        Self {
            id: IapId::new(row.id),
            nombre: row.nombre,
            estatus: row.estatus,
            rubro: row.rubro,
            necesidad_primaria: row.necesidad_primaria,
            necesidad_complementaria: row.necesidad_complementaria,
            clasificaciones: row.clasificaciones,
            es_certificada: row.es_certificada,
            es_donataria_autorizada: row.es_donataria_autorizada,
            tiene_padron_beneficiarios: row.tiene_padron_beneficiarios,
            beneficiarios_directos: row.beneficiarios_directos,
            beneficiarios_indirectos: row.beneficiarios_indirectos,
            veces_donado: row.veces_donado,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for institution database operations.
pub struct IapRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> IapRepository<'a> {
    /// Create a new institution repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register an institution. `veces_donado` always starts at zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &CreateIapInput) -> Result<Iap, RepositoryError> {
        let row = sqlx::query_as::<_, IapRow>(concat!(
            r"
            INSERT INTO japem.iap (
                nombre, estatus, rubro, necesidad_primaria, necesidad_complementaria,
                clasificaciones, es_certificada, es_donataria_autorizada,
                tiene_padron_beneficiarios, beneficiarios_directos, beneficiarios_indirectos
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING ",
            iap_columns!()
        ))
        .bind(input.nombre.trim())
        .bind(input.estatus)
        .bind(input.rubro.as_deref())
        .bind(input.necesidad_primaria.as_deref())
        .bind(input.necesidad_complementaria.as_deref())
        .bind(normalize_clasificaciones(&input.clasificaciones))
        .bind(input.es_certificada)
        .bind(input.es_donataria_autorizada)
        .bind(input.tiene_padron_beneficiarios)
        .bind(input.beneficiarios_directos)
        .bind(input.beneficiarios_indirectos)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get an institution by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: IapId) -> Result<Option<Iap>, RepositoryError> {
        let row = sqlx::query_as::<_, IapRow>(concat!(
            "SELECT ",
            iap_columns!(),
            "FROM japem.iap WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List institutions ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &IapFilter) -> Result<Vec<Iap>, RepositoryError> {
        let rows = sqlx::query_as::<_, IapRow>(concat!(
            "SELECT ",
            iap_columns!(),
            r"
            FROM japem.iap
            WHERE ($1::japem.iap_estatus IS NULL OR estatus = $1)
            ORDER BY nombre ASC, id ASC
            "
        ))
        .bind(filter.estatus)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Update an institution. Absent fields keep their value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the institution doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: IapId, input: &UpdateIapInput) -> Result<Iap, RepositoryError> {
        let row = sqlx::query_as::<_, IapRow>(concat!(
            r"
            UPDATE japem.iap
            SET
                nombre = COALESCE($2, nombre),
                estatus = COALESCE($3, estatus),
                rubro = COALESCE($4, rubro),
                necesidad_primaria = COALESCE($5, necesidad_primaria),
                necesidad_complementaria = COALESCE($6, necesidad_complementaria),
                clasificaciones = COALESCE($7, clasificaciones),
                es_certificada = COALESCE($8, es_certificada),
                es_donataria_autorizada = COALESCE($9, es_donataria_autorizada),
                tiene_padron_beneficiarios = COALESCE($10, tiene_padron_beneficiarios),
                beneficiarios_directos = COALESCE($11, beneficiarios_directos),
                beneficiarios_indirectos = COALESCE($12, beneficiarios_indirectos),
                updated_at = NOW()
            WHERE id = $1
            RETURNING ",
            iap_columns!()
        ))
        .bind(id.as_i32())
        .bind(input.nombre.as_deref().map(str::trim))
        .bind(input.estatus)
        .bind(input.rubro.as_deref())
        .bind(input.necesidad_primaria.as_deref())
        .bind(input.necesidad_complementaria.as_deref())
        .bind(input.clasificaciones.as_deref().map(normalize_clasificaciones))
        .bind(input.es_certificada)
        .bind(input.es_donataria_autorizada)
        .bind(input.tiene_padron_beneficiarios)
        .bind(input.beneficiarios_directos)
        .bind(input.beneficiarios_indirectos)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Active institutions whose needs or sector contain `pattern`.
    ///
    /// `pattern` is a complete `ILIKE` pattern with wildcards already escaped.
    /// Ranking is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_matching(&self, pattern: &str) -> Result<Vec<Iap>, RepositoryError> {
        let rows = sqlx::query_as::<_, IapRow>(concat!(
            "SELECT ",
            iap_columns!(),
            r"
            FROM japem.iap
            WHERE estatus = 'activa'
              AND (
                necesidad_primaria ILIKE $1 ESCAPE '\'
                OR necesidad_complementaria ILIKE $1 ESCAPE '\'
                OR rubro ILIKE $1 ESCAPE '\'
              )
            "
        ))
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Lock an institution row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_update(
    conn: &mut PgConnection,
    id: IapId,
) -> Result<Option<Iap>, RepositoryError> {
    let row = sqlx::query_as::<_, IapRow>(concat!(
        "SELECT ",
        iap_columns!(),
        "FROM japem.iap WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Record one completed allocation/delivery event for an institution.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the institution doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn increment_veces_donado(
    conn: &mut PgConnection,
    id: IapId,
) -> Result<i32, RepositoryError> {
    let veces = sqlx::query_scalar::<_, i32>(
        r"
        UPDATE japem.iap
        SET veces_donado = veces_donado + 1, updated_at = NOW()
        WHERE id = $1
        RETURNING veces_donado
        ",
    )
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(veces)
}

/// Trim classifications and drop duplicates, keeping first-seen order.
fn normalize_clasificaciones(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !out.iter().any(|v| v.eq_ignore_ascii_case(trimmed)) {
            out.push(trimmed.to_owned());
        }
    }
    out
}
