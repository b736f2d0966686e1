//! Product catalog models.
//!
//! The catalog row is the canonical product identity: lots reference it by
//! id, and name lookups elsewhere resolve to exactly one catalog row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use japem_core::ProductoId;

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producto {
    /// Unique product ID.
    pub id: ProductoId,
    /// Display name (unique, case-insensitive).
    pub nombre: String,
    /// Category (e.g., "ABARROTES").
    pub categoria: String,
    /// Unit of measure (e.g., "KG", "PIEZA").
    pub unidad_medida: String,
    /// When the product was registered.
    pub created_at: DateTime<Utc>,
}

/// Input for registering a catalog product.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateProductoInput {
    #[validate(
        length(max = 200, message = "must be at most 200 characters"),
        custom(function = "super::validate_not_blank")
    )]
    pub nombre: String,
    #[validate(
        length(max = 100, message = "must be at most 100 characters"),
        custom(function = "super::validate_not_blank")
    )]
    pub categoria: String,
    #[validate(
        length(max = 50, message = "must be at most 50 characters"),
        custom(function = "super::validate_not_blank")
    )]
    pub unidad_medida: String,
}

impl CreateProductoInput {
    /// Canonical form of the product name: trimmed, inner whitespace collapsed.
    #[must_use]
    pub fn normalized_nombre(&self) -> String {
        normalize_product_name(&self.nombre)
    }
}

/// Normalize a free-text product name for storage and lookup.
#[must_use]
pub fn normalize_product_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_product_name() {
        assert_eq!(normalize_product_name("  Arroz   blanco "), "Arroz blanco");
        assert_eq!(normalize_product_name("ACEITE"), "ACEITE");
    }

    #[test]
    fn test_create_input_rejects_unknown_fields() {
        let result = serde_json::from_str::<CreateProductoInput>(
            r#"{"nombre":"ARROZ","categoria":"ABARROTES","unidad_medida":"KG","precio":3}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_create_input_rejects_blank_name() {
        let input: CreateProductoInput = serde_json::from_str(
            r#"{"nombre":"  ","categoria":"ABARROTES","unidad_medida":"KG"}"#,
        )
        .unwrap();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("nombre"));
    }
}
