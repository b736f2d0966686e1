//! FIFO stock allocator.
//!
//! Draws a requested quantity of one product from its lots, oldest first.
//! Planning is a pure function over lot snapshots; [`allocate`] locks the
//! lots, plans, and persists the decrements inside the caller's transaction.

use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{debug, instrument};

use japem_core::LoteId;

use super::StockError;
use crate::db::inventario::{self, LockedLot};
use crate::models::producto::Producto;

/// Quantity taken from a single lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub lote_id: LoteId,
    pub cantidad: Decimal,
}

/// Not enough stock to cover a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub solicitado: Decimal,
    pub disponible: Decimal,
}

impl Shortfall {
    /// Quantity missing to satisfy the request.
    #[must_use]
    pub fn faltante(&self) -> Decimal {
        self.solicitado - self.disponible
    }
}

/// Plan draws over `lots` (already in FIFO order) for `solicitado`.
///
/// Fails without drawing anything when the lots together hold less than
/// requested. Otherwise the draws sum exactly to `solicitado` and no draw
/// exceeds its lot's quantity.
///
/// # Errors
///
/// Returns `Shortfall` if total available is below `solicitado`.
pub fn plan_fifo(lots: &[LockedLot], solicitado: Decimal) -> Result<Vec<Draw>, Shortfall> {
    let disponible: Decimal = lots
        .iter()
        .map(|lot| lot.cantidad.max(Decimal::ZERO))
        .sum();

    if disponible < solicitado {
        return Err(Shortfall {
            solicitado,
            disponible,
        });
    }

    let mut draws = Vec::new();
    let mut remaining = solicitado;

    for lot in lots {
        if remaining <= Decimal::ZERO {
            break;
        }
        if lot.cantidad <= Decimal::ZERO {
            continue;
        }

        let take = remaining.min(lot.cantidad);
        draws.push(Draw {
            lote_id: lot.id,
            cantidad: take,
        });
        remaining -= take;
    }

    Ok(draws)
}

/// Allocate `solicitado` units of `producto` from its lots in FIFO order.
///
/// Locks every lot of the product that still has stock (`FOR UPDATE`) and
/// decrements the lots drawn from. Must run inside a transaction: on error
/// the caller drops it and every decrement made so far is rolled back.
///
/// # Errors
///
/// Returns `StockError::InsufficientStock` if the product's lots hold less
/// than `solicitado`.
/// Returns `StockError::Repository` if a query fails.
#[instrument(skip(conn, producto), fields(producto_id = %producto.id, producto = %producto.nombre))]
pub async fn allocate(
    conn: &mut PgConnection,
    producto: &Producto,
    solicitado: Decimal,
) -> Result<Vec<Draw>, StockError> {
    let lots = inventario::lock_available_for_product(conn, producto.id).await?;

    let draws = plan_fifo(&lots, solicitado).map_err(|shortfall| {
        debug!(
            solicitado = %shortfall.solicitado,
            disponible = %shortfall.disponible,
            "Insufficient stock"
        );
        StockError::InsufficientStock {
            producto: producto.nombre.clone(),
            solicitado: shortfall.solicitado,
            disponible: shortfall.disponible,
        }
    })?;

    for draw in &draws {
        inventario::decrement(conn, draw.lote_id, draw.cantidad).await?;
    }

    debug!(lots = draws.len(), %solicitado, "Allocated stock");
    Ok(draws)
}
