//! Donation models. Recording a donation creates one inventory lot per
//! product line.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use japem_core::{DonacionId, ProductoId, UsuarioId};

use super::InventoryLot;

/// A recorded donation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donacion {
    pub id: DonacionId,
    pub fecha_donacion: NaiveDate,
    pub observaciones: Option<String>,
    pub created_by: Option<UsuarioId>,
    pub created_at: DateTime<Utc>,
}

/// A donation with the lots it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonacionConLotes {
    #[serde(flatten)]
    pub donacion: Donacion,
    pub lotes: Vec<InventoryLot>,
}

/// Input for `POST /donaciones`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateDonacionInput {
    /// Defaults to today.
    pub fecha_donacion: Option<NaiveDate>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub observaciones: Option<String>,
    #[validate(
        length(min = 1, message = "at least one product is required"),
        custom(function = "validate_distinct_products"),
        nested
    )]
    pub productos: Vec<LineaDonacionInput>,
}

/// One product line of a donation; becomes one lot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LineaDonacionInput {
    pub producto_id: ProductoId,
    #[validate(custom(function = "super::validate_quantity"))]
    pub cantidad: Decimal,
    #[validate(custom(function = "super::validate_price"))]
    pub precio_unitario: Option<Decimal>,
    #[validate(custom(function = "super::validate_price"))]
    pub precio_mercado: Option<Decimal>,
    pub fecha_caducidad: Option<NaiveDate>,
}

fn validate_distinct_products(lines: &[LineaDonacionInput]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(lines.len());
    if lines.iter().all(|line| seen.insert(line.producto_id)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("distinct");
        err.message = Some("each product may appear only once per donation".into());
        Err(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_duplicate_products() {
        let input: CreateDonacionInput = serde_json::from_str(
            r#"{"productos":[{"producto_id":1,"cantidad":5},{"producto_id":1,"cantidad":2}]}"#,
        )
        .unwrap();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("productos"));
    }

    #[test]
    fn test_accepts_distinct_products() {
        let input: CreateDonacionInput = serde_json::from_str(
            r#"{"fecha_donacion":"2026-03-02","productos":[
                {"producto_id":1,"cantidad":5,"precio_unitario":"12.50","fecha_caducidad":"2026-09-30"},
                {"producto_id":2,"cantidad":"1.5"}
            ]}"#,
        )
        .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.productos[0].precio_unitario, Some(Decimal::new(1250, 2)));
    }

    #[test]
    fn test_rejects_negative_price() {
        let input: CreateDonacionInput = serde_json::from_str(
            r#"{"productos":[{"producto_id":1,"cantidad":5,"precio_mercado":-1}]}"#,
        )
        .unwrap();
        assert!(input.validate().is_err());
    }
}
