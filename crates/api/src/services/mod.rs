//! Business logic services.
//!
//! # Services
//!
//! - `allocator` - FIFO stock allocation over locked inventory lots
//! - `matcher` - Institution suggestions for a product
//! - `recording` - Transactional allocation, delivery and donation recording
//! - `auth` - Bearer token generation and hashing

pub mod allocator;
pub mod auth;
pub mod matcher;
pub mod recording;

use rust_decimal::Decimal;
use thiserror::Error;

use japem_core::{AsignacionId, IapId, LoteId, ProductoId};

use crate::db::RepositoryError;

pub use allocator::{Draw, Shortfall, allocate, plan_fifo};
pub use auth::{generate_token, hash_token};
pub use matcher::{MAX_SUGGESTIONS, suggest};
pub use recording::RecordingService;

/// Errors raised while moving stock.
///
/// Any of these aborts the enclosing transaction.
#[derive(Debug, Error)]
pub enum StockError {
    /// Institution does not exist.
    #[error("institution {0} not found")]
    InstitutionNotFound(IapId),

    /// Institution exists but is not active.
    #[error("institution {0} is not active")]
    InstitutionInactive(IapId),

    /// Referenced inventory lot does not exist.
    #[error("inventory lot {0} not found")]
    LotNotFound(LoteId),

    /// Referenced catalog product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(String),

    /// Allocation does not exist.
    #[error("allocation {0} not found")]
    AllocationNotFound(AsignacionId),

    /// Not enough stock across all lots of a product.
    #[error(
        "insufficient stock for {producto}: requested {solicitado}, available {disponible}"
    )]
    InsufficientStock {
        producto: String,
        solicitado: Decimal,
        disponible: Decimal,
    },

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl StockError {
    /// Shortcut for a product referenced by catalog id.
    #[must_use]
    pub fn product_id_not_found(id: ProductoId) -> Self {
        Self::ProductNotFound(format!("#{id}"))
    }
}

impl From<sqlx::Error> for StockError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_names_product() {
        let err = StockError::InsufficientStock {
            producto: "ACEITE".to_owned(),
            solicitado: Decimal::new(10, 0),
            disponible: Decimal::new(3, 0),
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for ACEITE: requested 10, available 3"
        );
    }

    #[test]
    fn test_product_id_not_found() {
        let err = StockError::product_id_not_found(ProductoId::new(12));
        assert_eq!(err.to_string(), "product #12 not found");
    }
}
