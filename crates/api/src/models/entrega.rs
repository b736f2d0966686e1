//! Direct delivery (entrega) models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use japem_core::{EntregaDetalleId, EntregaId, IapId, LoteId, UsuarioId};

/// Delivery header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entrega {
    pub id: EntregaId,
    pub iap_id: IapId,
    pub created_by: Option<UsuarioId>,
    pub created_at: DateTime<Utc>,
}

/// One lot drawn from for a delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntregaDetalle {
    pub id: EntregaDetalleId,
    pub entrega_id: EntregaId,
    pub inventario_id: LoteId,
    pub nombre_producto: String,
    pub cantidad: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Delivery header with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntregaConDetalles {
    #[serde(flatten)]
    pub entrega: Entrega,
    pub detalles: Vec<EntregaDetalle>,
}

/// A historical delivery line with institution context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorialEntrega {
    pub detalle_id: EntregaDetalleId,
    pub entrega_id: EntregaId,
    pub iap_id: IapId,
    pub iap_nombre: String,
    pub inventario_id: LoteId,
    pub nombre_producto: String,
    pub cantidad: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for `POST /entregas`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateEntregaInput {
    pub iap_id: IapId,
    #[validate(length(min = 1, message = "at least one line is required"), nested)]
    pub detalles: Vec<DetalleEntregaInput>,
}

/// A requested delivery line, identified by product name.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DetalleEntregaInput {
    #[validate(
        length(max = 200, message = "must be at most 200 characters"),
        custom(function = "super::validate_not_blank")
    )]
    pub nombre_producto: String,
    #[validate(custom(function = "super::validate_quantity"))]
    pub cantidad: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_body() {
        let input: CreateEntregaInput = serde_json::from_str(
            r#"{"iap_id":1,"detalles":[{"nombre_producto":"ARROZ","cantidad":7}]}"#,
        )
        .unwrap();
        assert_eq!(input.detalles[0].nombre_producto, "ARROZ");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_rejects_blank_product_name() {
        let input: CreateEntregaInput = serde_json::from_str(
            r#"{"iap_id":1,"detalles":[{"nombre_producto":" ","cantidad":1}]}"#,
        )
        .unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_rejects_missing_iap() {
        let result = serde_json::from_str::<CreateEntregaInput>(
            r#"{"detalles":[{"nombre_producto":"ARROZ","cantidad":1}]}"#,
        );
        assert!(result.is_err());
    }
}
