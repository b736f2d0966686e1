//! Allocation (asignación) models: stock committed to an institution
//! pending physical handover.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use japem_core::{AsignacionDetalleId, AsignacionEstatus, AsignacionId, IapId, LoteId, UsuarioId};

/// Allocation header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asignacion {
    pub id: AsignacionId,
    pub iap_id: IapId,
    pub estatus: AsignacionEstatus,
    pub created_by: Option<UsuarioId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub entregada_at: Option<DateTime<Utc>>,
}

/// One lot drawn from for an allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsignacionDetalle {
    pub id: AsignacionDetalleId,
    pub asignacion_id: AsignacionId,
    /// Source lot.
    pub inventario_id: LoteId,
    /// Product name at the time of allocation.
    pub nombre_producto: String,
    pub cantidad: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Allocation header with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsignacionConDetalles {
    #[serde(flatten)]
    pub asignacion: Asignacion,
    pub detalles: Vec<AsignacionDetalle>,
}

/// A historical allocation line with institution context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorialAsignacion {
    pub detalle_id: AsignacionDetalleId,
    pub asignacion_id: AsignacionId,
    pub iap_id: IapId,
    pub iap_nombre: String,
    pub estatus: AsignacionEstatus,
    pub inventario_id: LoteId,
    pub nombre_producto: String,
    pub cantidad: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for `POST /distribucion`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateAsignacionInput {
    pub iap_id: IapId,
    #[validate(length(min = 1, message = "at least one line is required"), nested)]
    pub detalles: Vec<DetalleAsignacionInput>,
}

/// A requested allocation line.
///
/// The referenced lot identifies the product; stock is drawn FIFO from all
/// lots of that product, not only from the referenced one.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DetalleAsignacionInput {
    pub inventario_id: LoteId,
    #[validate(custom(function = "super::validate_quantity"))]
    pub cantidad: Decimal,
}

/// Filter criteria for history listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistorialFilter {
    pub iap_id: Option<IapId>,
    pub limit: Option<i64>,
}
