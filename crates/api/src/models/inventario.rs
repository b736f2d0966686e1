//! Inventory lot domain models.
//!
//! A lot is one receipt of a product. Its `cantidad` is the quantity still
//! available and only ever goes down, through the stock allocator.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use japem_core::{DonacionId, LoteId, ProductoId};

/// An inventory lot with its product's catalog data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLot {
    /// Unique lot ID.
    pub id: LoteId,
    /// Catalog product this lot holds.
    pub producto_id: ProductoId,
    /// Product name (from the catalog).
    pub nombre_producto: String,
    /// Product category (from the catalog).
    pub categoria: String,
    /// Unit of measure (from the catalog).
    pub unidad_medida: String,
    /// Quantity still available.
    pub cantidad: Decimal,
    /// Quantity originally received.
    pub cantidad_inicial: Decimal,
    /// Unit price declared by the donor.
    pub precio_unitario: Option<Decimal>,
    /// Reference market price per unit.
    pub precio_mercado: Option<Decimal>,
    /// Expiry date, if perishable.
    pub fecha_caducidad: Option<NaiveDate>,
    /// When the goods were received.
    pub fecha_recepcion: DateTime<Utc>,
    /// Donation that produced this lot.
    pub donacion_id: Option<DonacionId>,
    /// When the lot was created (FIFO order).
    pub created_at: DateTime<Utc>,
    /// When the lot was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Aggregated stock for one product across all lots with remaining quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventarioAgregado {
    pub producto_id: ProductoId,
    pub nombre_producto: String,
    pub categoria: String,
    pub unidad_medida: String,
    /// Sum of remaining quantity.
    pub cantidad_total: Decimal,
    /// Number of lots contributing stock.
    pub lotes: i64,
}

/// Filter criteria for listing lots.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LotFilter {
    /// Filter by catalog product.
    pub producto_id: Option<ProductoId>,
    /// Only lots with remaining quantity > 0.
    pub con_existencia: Option<bool>,
    /// Maximum number of results.
    pub limit: Option<i64>,
    /// Number of results to skip.
    pub offset: Option<i64>,
}
