//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness (no auth)
//! GET  /health/ready                  - Database readiness (no auth)
//!
//! # Catalog and stock
//! POST /productos                     - Register a product
//! GET  /productos                     - List the catalog
//! POST /donaciones                    - Record a donation (one lot per product)
//! GET  /donaciones/{id}               - Donation with its lots
//! GET  /inventario                    - Aggregated stock per product
//! GET  /inventario/lotes              - Lots in FIFO order
//! GET  /inventario/lotes/{id}         - Lot detail
//!
//! # Institutions
//! GET  /iaps/sugerencias?producto=    - Up to 5 ranked active institutions
//! POST /iaps                          - Register an institution
//! GET  /iaps                          - List institutions
//! GET  /iaps/{id}                     - Institution detail
//! PUT  /iaps/{id}                     - Update an institution
//!
//! # Movements
//! POST /distribucion                  - Allocate stock (FIFO)
//! GET  /distribucion/historial        - Allocation lines, newest first
//! GET  /distribucion/{id}             - Allocation with lines
//! POST /distribucion/{id}/entregar    - Mark an allocation delivered
//! POST /entregas                      - Direct delivery by product name
//! GET  /entregas/historial            - Delivery lines, newest first
//! ```
//!
//! Every route except the health probes requires `Authorization: Bearer`.

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod distribucion;
pub mod donaciones;
pub mod entregas;
pub mod health;
pub mod iaps;
pub mod inventario;
pub mod productos;

/// Build the application router (without outer middleware layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Catalog and stock
        .route("/productos", post(productos::create).get(productos::list))
        .route("/donaciones", post(donaciones::create))
        .route("/donaciones/{id}", get(donaciones::get))
        .route("/inventario", get(inventario::aggregated))
        .route("/inventario/lotes", get(inventario::list_lots))
        .route("/inventario/lotes/{id}", get(inventario::get_lot))
        // Institutions
        .route("/iaps/sugerencias", get(iaps::suggestions))
        .route("/iaps", post(iaps::create).get(iaps::list))
        .route("/iaps/{id}", get(iaps::get).put(iaps::update))
        // Movements
        .route("/distribucion", post(distribucion::create))
        .route("/distribucion/historial", get(distribucion::history))
        .route("/distribucion/{id}", get(distribucion::get))
        .route("/distribucion/{id}/entregar", post(distribucion::mark_delivered))
        .route("/entregas", post(entregas::create))
        .route("/entregas/historial", get(entregas::history))
}
