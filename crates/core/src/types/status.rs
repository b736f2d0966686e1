//! Status enums for various entities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a status or role from text fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Whether a beneficiary institution (IAP) may currently receive goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "iap_estatus", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum IapEstatus {
    #[default]
    Activa,
    Inactiva,
}

impl IapEstatus {
    /// Returns true if the institution can be matched and receive stock.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Activa)
    }
}

impl std::fmt::Display for IapEstatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activa => write!(f, "activa"),
            Self::Inactiva => write!(f, "inactiva"),
        }
    }
}

impl std::str::FromStr for IapEstatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activa" => Ok(Self::Activa),
            "inactiva" => Ok(Self::Inactiva),
            _ => Err(ParseStatusError::new("institution status", s)),
        }
    }
}

/// Lifecycle of an allocation header.
///
/// An allocation commits stock to an institution (`Pendiente`) and is later
/// marked as physically handed over (`Entregada`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "asignacion_estatus", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AsignacionEstatus {
    #[default]
    Pendiente,
    Entregada,
}

impl std::fmt::Display for AsignacionEstatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pendiente => write!(f, "pendiente"),
            Self::Entregada => write!(f, "entregada"),
        }
    }
}

/// User role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "rol_usuario", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access, including institution management.
    Admin,
    /// Records donations, allocations and deliveries.
    Operador,
    /// Read-only access.
    Consulta,
}

impl UserRole {
    /// Returns true if the role may create or modify records.
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Admin | Self::Operador)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Operador => write!(f, "operador"),
            Self::Consulta => write!(f, "consulta"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "operador" => Ok(Self::Operador),
            "consulta" => Ok(Self::Consulta),
            _ => Err(ParseStatusError::new("user role", s)),
        }
    }
}
