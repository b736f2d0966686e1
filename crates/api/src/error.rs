//! Unified error handling for the API.
//!
//! Every failure reaches the client as a JSON envelope with a human-readable
//! `message`, plus `errors` for validation failures and the stock figures for
//! insufficient stock.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::db::RepositoryError;
use crate::services::StockError;

/// Field path to messages, e.g. `detalles[0].cantidad` -> `["must be greater than zero"]`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body is malformed or fails validation.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: FieldErrors,
    },

    /// Not enough stock to cover a requested line.
    #[error("Insufficient stock for {producto}: requested {solicitado}, available {disponible}")]
    InsufficientStock {
        producto: String,
        solicitado: Decimal,
        disponible: Decimal,
    },

    /// Well-formed request that can't be applied (e.g. inactive institution).
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InsufficientStock { .. } | Self::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn client_message(&self) -> String {
        match self {
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Validation { message, .. } => message.clone(),
            Self::InsufficientStock {
                producto,
                solicitado,
                disponible,
            } => format!(
                "Insufficient stock for {producto}: requested {solicitado}, available {disponible}, short by {}",
                solicitado - disponible
            ),
            Self::Unprocessable(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::BadRequest(m) => m.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        }

        let status = self.status();
        let message = self.client_message();

        let body = match self {
            Self::Validation { errors, .. } => json!({ "message": message, "errors": errors }),
            Self::InsufficientStock {
                producto,
                solicitado,
                disponible,
            } => json!({
                "message": message,
                "producto": producto,
                "solicitado": solicitado,
                "disponible": disponible,
                "faltante": solicitado - disponible,
            }),
            _ => json!({ "message": message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Resource not found".to_owned()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Database(other),
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::InsufficientStock {
                producto,
                solicitado,
                disponible,
            } => Self::InsufficientStock {
                producto,
                solicitado,
                disponible,
            },
            StockError::InstitutionInactive(_) => Self::Unprocessable(err.to_string()),
            StockError::InstitutionNotFound(_)
            | StockError::LotNotFound(_)
            | StockError::ProductNotFound(_)
            | StockError::AllocationNotFound(_) => Self::NotFound(err.to_string()),
            StockError::Repository(inner) => inner.into(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        flatten_validation_errors(&errors, None, &mut fields);
        Self::Validation {
            message: "Invalid request".to_owned(),
            errors: fields,
        }
    }
}

/// Flatten nested validation errors into dotted/indexed field paths.
fn flatten_validation_errors(
    errors: &ValidationErrors,
    prefix: Option<&str>,
    out: &mut FieldErrors,
) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(p) => format!("{p}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = out.entry(path).or_default();
                for error in list {
                    messages.push(
                        error
                            .message
                            .as_ref()
                            .map_or_else(|| error.code.to_string(), ToString::to_string),
                    );
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                flatten_validation_errors(inner, Some(&path), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(inner, Some(&format!("{path}[{index}]")), out);
                }
            }
        }
    }
}

/// Set the Sentry user context for the authenticated principal.
pub fn set_sentry_user(usuario_id: i32, nombre: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(usuario_id.to_string()),
            username: Some(nombre.to_owned()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use japem_core::{IapId, LoteId};
    use validator::Validate;

    use super::*;
    use crate::models::CreateAsignacionInput;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("lote 123".to_owned());
        assert_eq!(err.to_string(), "Not found: lote 123");

        let err = AppError::BadRequest("invalid input".to_owned());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_owned()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized("test".to_owned()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("test".to_owned()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("test".to_owned()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unprocessable("test".to_owned()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Internal("test".to_owned()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_insufficient_stock_envelope() {
        let err: AppError = StockError::InsufficientStock {
            producto: "ACEITE".to_owned(),
            solicitado: Decimal::new(10, 0),
            disponible: Decimal::new(3, 0),
        }
        .into();

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["producto"], "ACEITE");
        assert_eq!(body["faltante"], "7");
        assert!(body["message"].as_str().unwrap().contains("ACEITE"));
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::from(RepositoryError::DataCorruption("secret detail".to_owned()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_stock_error_mapping() {
        assert_eq!(
            AppError::from(StockError::InstitutionInactive(IapId::new(1))).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(StockError::LotNotFound(LoteId::new(9))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StockError::Repository(RepositoryError::Conflict("x".to_owned())))
                .status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_nested_validation_paths() {
        let input: CreateAsignacionInput = serde_json::from_str(
            r#"{"iap_id":1,"detalles":[{"inventario_id":1,"cantidad":2},{"inventario_id":2,"cantidad":0}]}"#,
        )
        .unwrap();
        let err = AppError::from(input.validate().unwrap_err());

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["detalles[1].cantidad"].is_array());
    }
}
