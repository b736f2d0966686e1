//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. CORS (only when origins are configured)
//! 3. `TraceLayer` (`http_request` span)
//! 4. Request ID (recorded on the span, echoed in the response)
//!
//! Authentication is not a layer: handlers take [`RequireAuth`] or
//! [`RequireWriter`] so the principal is always an explicit argument.

pub mod auth;
pub mod json;
pub mod request_id;

pub use auth::{RequireAuth, RequireWriter};
pub use json::ValidatedJson;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
