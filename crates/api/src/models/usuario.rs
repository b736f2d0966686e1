//! Users and the authenticated principal passed explicitly to every handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use japem_core::{UserRole, UsuarioId};

/// A registered API user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usuario {
    pub id: UsuarioId,
    pub email: String,
    pub nombre: String,
    pub rol: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Request context resolved from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Authenticated user.
    pub usuario_id: UsuarioId,
    /// User's display name (for logs).
    pub nombre: String,
    /// User's role.
    pub rol: UserRole,
}

impl RequestContext {
    /// Returns true if this principal may create or modify records.
    #[must_use]
    pub const fn can_write(&self) -> bool {
        self.rol.can_write()
    }
}
