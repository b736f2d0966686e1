//! Beneficiary institution (IAP) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use japem_core::{IapEstatus, IapId};

/// A beneficiary institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iap {
    /// Unique institution ID.
    pub id: IapId,
    /// Institution name.
    pub nombre: String,
    /// Whether the institution can currently receive goods.
    pub estatus: IapEstatus,
    /// Sector the institution works in.
    pub rubro: Option<String>,
    /// Main declared need.
    pub necesidad_primaria: Option<String>,
    /// Secondary declared need.
    pub necesidad_complementaria: Option<String>,
    /// Classifications / activities.
    pub clasificaciones: Vec<String>,
    /// Holds institutional certification.
    pub es_certificada: bool,
    /// Is an authorized donee for tax purposes.
    pub es_donataria_autorizada: bool,
    /// Keeps a beneficiary registry.
    pub tiene_padron_beneficiarios: bool,
    /// Direct beneficiaries served.
    pub beneficiarios_directos: i32,
    /// Indirect beneficiaries served.
    pub beneficiarios_indirectos: i32,
    /// Completed allocation/delivery events received.
    pub veces_donado: i32,
    /// When the institution was registered.
    pub created_at: DateTime<Utc>,
    /// When the institution was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for registering an institution.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateIapInput {
    #[validate(
        length(max = 255, message = "must be at most 255 characters"),
        custom(function = "super::validate_not_blank")
    )]
    pub nombre: String,
    #[serde(default)]
    pub estatus: IapEstatus,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub rubro: Option<String>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub necesidad_primaria: Option<String>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub necesidad_complementaria: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_clasificaciones"))]
    pub clasificaciones: Vec<String>,
    #[serde(default)]
    pub es_certificada: bool,
    #[serde(default)]
    pub es_donataria_autorizada: bool,
    #[serde(default)]
    pub tiene_padron_beneficiarios: bool,
    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub beneficiarios_directos: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub beneficiarios_indirectos: i32,
}

/// Input for updating an institution.
///
/// Absent fields keep their current value. `veces_donado` is not accepted:
/// only completed allocations and deliveries change it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateIapInput {
    #[validate(
        length(max = 255, message = "must be at most 255 characters"),
        custom(function = "super::validate_not_blank")
    )]
    pub nombre: Option<String>,
    pub estatus: Option<IapEstatus>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub rubro: Option<String>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub necesidad_primaria: Option<String>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub necesidad_complementaria: Option<String>,
    #[validate(custom(function = "validate_clasificaciones"))]
    pub clasificaciones: Option<Vec<String>>,
    pub es_certificada: Option<bool>,
    pub es_donataria_autorizada: Option<bool>,
    pub tiene_padron_beneficiarios: Option<bool>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub beneficiarios_directos: Option<i32>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub beneficiarios_indirectos: Option<i32>,
}

/// Filter criteria for listing institutions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IapFilter {
    pub estatus: Option<IapEstatus>,
}

fn validate_clasificaciones(values: &[String]) -> Result<(), validator::ValidationError> {
    for value in values {
        super::validate_not_blank(value)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults() {
        let input: CreateIapInput =
            serde_json::from_str(r#"{"nombre":"Casa Hogar","rubro":"ALIMENTACION"}"#).unwrap();
        assert_eq!(input.estatus, IapEstatus::Activa);
        assert!(input.clasificaciones.is_empty());
        assert!(!input.es_certificada);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_update_rejects_donation_counter() {
        let result = serde_json::from_str::<UpdateIapInput>(r#"{"veces_donado":0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_rejects_blank_classification() {
        let input: CreateIapInput =
            serde_json::from_str(r#"{"nombre":"Casa Hogar","clasificaciones":["SALUD"," "]}"#)
                .unwrap();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("clasificaciones"));
    }

    #[test]
    fn test_create_rejects_negative_beneficiaries() {
        let input: CreateIapInput =
            serde_json::from_str(r#"{"nombre":"Casa Hogar","beneficiarios_directos":-3}"#)
                .unwrap();
        assert!(input.validate().is_err());
    }
}
