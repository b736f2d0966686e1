//! Database operations for API users and their bearer tokens.
//!
//! Tokens are never stored in clear; callers pass the SHA-256 hex digest
//! produced by `services::auth::hash_token`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use japem_core::{ApiTokenId, UserRole, UsuarioId};

use super::{RepositoryError, map_unique_violation};
use crate::models::usuario::{RequestContext, Usuario};

#[derive(Debug, sqlx::FromRow)]
struct UsuarioRow {
    id: i32,
    email: String,
    nombre: String,
    rol: UserRole,
    created_at: DateTime<Utc>,
}

impl From<UsuarioRow> for Usuario {
    fn from(row: UsuarioRow) -> Self {
        Self {
            id: UsuarioId::new(row.id),
            email: row.email,
            nombre: row.nombre,
            rol: row.rol,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PrincipalRow {
    id: i32,
    nombre: String,
    rol: UserRole,
}

/// Repository for users and token lookups.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    /// Create a new token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a token digest to its principal and stamp `last_used_at`.
    ///
    /// Revoked tokens resolve to `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve(
        &self,
        token_hash: &str,
    ) -> Result<Option<RequestContext>, RepositoryError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r"
            UPDATE japem.api_token t
            SET last_used_at = NOW()
            FROM japem.usuario u
            WHERE u.id = t.usuario_id
              AND t.token_hash = $1
              AND t.revoked_at IS NULL
            RETURNING u.id, u.nombre, u.rol
            ",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|row| RequestContext {
            usuario_id: UsuarioId::new(row.id),
            nombre: row.nombre,
            rol: row.rol,
        }))
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_user(
        &self,
        email: &str,
        nombre: &str,
        rol: UserRole,
    ) -> Result<Usuario, RepositoryError> {
        let row = sqlx::query_as::<_, UsuarioRow>(
            r"
            INSERT INTO japem.usuario (email, nombre, rol)
            VALUES ($1, $2, $3)
            RETURNING id, email, nombre, rol, created_at
            ",
        )
        .bind(email.trim())
        .bind(nombre.trim())
        .bind(rol)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "a user with this email already exists"))?;

        Ok(row.into())
    }

    /// Find a user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Usuario>, RepositoryError> {
        let row = sqlx::query_as::<_, UsuarioRow>(
            r"
            SELECT id, email, nombre, rol, created_at
            FROM japem.usuario
            WHERE LOWER(email) = LOWER($1)
            ",
        )
        .bind(email.trim())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Store the digest of a newly issued token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a digest collision.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert_token(
        &self,
        usuario_id: UsuarioId,
        token_hash: &str,
    ) -> Result<ApiTokenId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO japem.api_token (usuario_id, token_hash)
            VALUES ($1, $2)
            RETURNING id
            ",
        )
        .bind(usuario_id.as_i32())
        .bind(token_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "token digest collision"))?;

        Ok(ApiTokenId::new(id))
    }

    /// Revoke every active token of a user. Returns how many were revoked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn revoke_all(&self, usuario_id: UsuarioId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE japem.api_token
            SET revoked_at = NOW()
            WHERE usuario_id = $1 AND revoked_at IS NULL
            ",
        )
        .bind(usuario_id.as_i32())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
