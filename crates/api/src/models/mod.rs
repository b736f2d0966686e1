//! Domain models and validated request inputs.
//!
//! Every request body is an explicit struct with `#[serde(deny_unknown_fields)]`
//! and `validator` rules; nothing is merged into persistence untyped.

pub mod asignacion;
pub mod donacion;
pub mod entrega;
pub mod iap;
pub mod inventario;
pub mod producto;
pub mod usuario;

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;

pub use asignacion::{
    Asignacion, AsignacionConDetalles, AsignacionDetalle, CreateAsignacionInput,
    DetalleAsignacionInput, HistorialAsignacion, HistorialFilter,
};
pub use donacion::{CreateDonacionInput, Donacion, DonacionConLotes, LineaDonacionInput};
pub use entrega::{
    CreateEntregaInput, DetalleEntregaInput, Entrega, EntregaConDetalles, EntregaDetalle,
    HistorialEntrega,
};
pub use iap::{CreateIapInput, Iap, IapFilter, UpdateIapInput};
pub use inventario::{InventarioAgregado, InventoryLot, LotFilter};
pub use producto::{CreateProductoInput, Producto};
pub use usuario::{RequestContext, Usuario};

/// Build a validation error with a human-readable message.
fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Quantities are stored as `NUMERIC(14, 3)`.
const QUANTITY_SCALE: u32 = 3;
const QUANTITY_INTEGER_DIGITS: u32 = 11;

/// Prices are stored as `NUMERIC(12, 2)`.
const PRICE_SCALE: u32 = 2;
const PRICE_INTEGER_DIGITS: u32 = 10;

/// Checks that a column with `scale` fractional and `integer_digits` integer
/// digits stores `value` exactly. Trailing zeros don't count.
fn fits_column(
    value: &Decimal,
    scale: u32,
    integer_digits: u32,
    scale_message: &'static str,
) -> Result<(), ValidationError> {
    if value.normalize().scale() > scale {
        return Err(invalid("scale", scale_message));
    }
    if value.abs() >= Decimal::from(10_u64.pow(integer_digits)) {
        return Err(invalid("range", "is too large"));
    }
    Ok(())
}

/// Quantities moved or received must be strictly positive and representable
/// without rounding.
pub(crate) fn validate_quantity(value: &Decimal) -> Result<(), ValidationError> {
    if !value.is_sign_positive() || value.is_zero() {
        return Err(invalid("positive", "must be greater than zero"));
    }
    fits_column(
        value,
        QUANTITY_SCALE,
        QUANTITY_INTEGER_DIGITS,
        "must have at most 3 decimal places",
    )
}

/// Prices may be zero (in-kind donations) but never negative.
pub(crate) fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("non_negative", "must not be negative"));
    }
    fits_column(
        value,
        PRICE_SCALE,
        PRICE_INTEGER_DIGITS,
        "must have at most 2 decimal places",
    )
}

/// Rejects empty and whitespace-only text.
pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("blank", "must not be blank"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(&Decimal::new(1, 3)).is_ok());
        assert!(validate_quantity(&Decimal::ZERO).is_err());
        assert!(validate_quantity(&Decimal::new(-5, 0)).is_err());
    }

    #[test]
    fn test_validate_quantity_rejects_precision_the_column_would_round() {
        let err = validate_quantity(&dec("1.0005")).unwrap_err();
        assert_eq!(err.code, "scale");
        assert!(validate_quantity(&dec("0.0001")).is_err());

        // Trailing zeros carry no extra precision.
        assert!(validate_quantity(&dec("1.5000")).is_ok());
        assert!(validate_quantity(&dec("0.001")).is_ok());
    }

    #[test]
    fn test_validate_quantity_range() {
        assert!(validate_quantity(&dec("99999999999.999")).is_ok());
        let err = validate_quantity(&dec("100000000000")).unwrap_err();
        assert_eq!(err.code, "range");
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(&Decimal::ZERO).is_ok());
        assert!(validate_price(&Decimal::new(1250, 2)).is_ok());
        assert!(validate_price(&dec("12.500")).is_ok());
        assert!(validate_price(&Decimal::new(-1, 2)).is_err());
        assert_eq!(validate_price(&dec("12.505")).unwrap_err().code, "scale");
        assert!(validate_price(&dec("9999999999.99")).is_ok());
        assert_eq!(validate_price(&dec("10000000000")).unwrap_err().code, "range");
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("ARROZ").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }
}
