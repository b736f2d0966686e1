//! Stock movement tests against `PostgreSQL`.
//!
//! These tests require a scratch database:
//! `JAPEM_TEST_DATABASE_URL=postgres://... cargo test -p japem-integration-tests -- --ignored`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

use japem_api::db::{
    AsignacionRepository, EntregaRepository, InventoryLotRepository, RepositoryError,
};
use japem_api::models::{
    CreateAsignacionInput, CreateEntregaInput, DetalleAsignacionInput, DetalleEntregaInput,
    HistorialFilter, Iap,
};
use japem_api::services::{RecordingService, StockError};
use japem_core::{AsignacionEstatus, UserRole};
use japem_integration_tests::{
    app_with_pool, lot_quantities, seed_iap, seed_lots, seed_producto, seed_user, test_pool,
    total_stock, veces_donado,
};

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

fn qty(s: &str) -> Decimal {
    s.parse().unwrap()
}

async fn post_json(app: &Router, token: &str, path: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post(path)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn asignaciones_for(pool: &PgPool, iap: &Iap) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM japem.asignacion WHERE iap_id = $1")
        .bind(iap.id.as_i32())
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// FIFO allocation
// ============================================================================

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_allocation_draws_oldest_lot_first() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[dec(5), dec(5)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    // Naming the newer lot still draws from the oldest first
    let recorded = RecordingService::new(&pool)
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![DetalleAsignacionInput {
                    inventario_id: lots[1],
                    cantidad: dec(7),
                }],
            },
        )
        .await
        .unwrap();

    let draws: Vec<_> = recorded
        .detalles
        .iter()
        .map(|d| (d.inventario_id, d.cantidad))
        .collect();
    assert_eq!(draws, vec![(lots[0], dec(5)), (lots[1], dec(2))]);
    assert!(recorded.detalles.iter().all(|d| d.nombre_producto == producto.nombre));
    assert_eq!(recorded.asignacion.estatus, AsignacionEstatus::Pendiente);

    assert_eq!(
        lot_quantities(&pool, &producto).await,
        vec![(lots[0], dec(0)), (lots[1], dec(3))]
    );
    assert_eq!(veces_donado(&pool, &iap).await, 1);
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_insufficient_stock_changes_nothing() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[dec(3)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    let err = RecordingService::new(&pool)
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![DetalleAsignacionInput {
                    inventario_id: lots[0],
                    cantidad: dec(10),
                }],
            },
        )
        .await
        .unwrap_err();

    match err {
        StockError::InsufficientStock {
            producto: nombre,
            solicitado,
            disponible,
        } => {
            assert_eq!(nombre, producto.nombre);
            assert_eq!(solicitado, dec(10));
            assert_eq!(disponible, dec(3));
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    assert_eq!(total_stock(&pool, &producto).await, dec(3));
    assert_eq!(asignaciones_for(&pool, &iap).await, 0);
    assert_eq!(veces_donado(&pool, &iap).await, 0);
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_failed_line_rolls_back_earlier_lines() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let arroz = seed_producto(&pool).await;
    let frijol = seed_producto(&pool).await;
    let arroz_lots = seed_lots(&pool, &ctx, &arroz, &[dec(10)]).await;
    let frijol_lots = seed_lots(&pool, &ctx, &frijol, &[dec(1)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    let result = RecordingService::new(&pool)
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![
                    DetalleAsignacionInput {
                        inventario_id: arroz_lots[0],
                        cantidad: dec(4),
                    },
                    DetalleAsignacionInput {
                        inventario_id: frijol_lots[0],
                        cantidad: dec(5),
                    },
                ],
            },
        )
        .await;

    assert!(matches!(result, Err(StockError::InsufficientStock { .. })));
    assert_eq!(total_stock(&pool, &arroz).await, dec(10));
    assert_eq!(total_stock(&pool, &frijol).await, dec(1));
    assert_eq!(asignaciones_for(&pool, &iap).await, 0);
    assert_eq!(veces_donado(&pool, &iap).await, 0);
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_concurrent_allocations_never_oversell() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[dec(4), dec(6)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let pool = pool.clone();
        let ctx = ctx.clone();
        let input = CreateAsignacionInput {
            iap_id: iap.id,
            detalles: vec![DetalleAsignacionInput {
                inventario_id: lots[0],
                cantidad: dec(3),
            }],
        };
        handles.push(tokio::spawn(async move {
            RecordingService::new(&pool)
                .record_asignacion(&ctx, &input)
                .await
                .is_ok()
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }

    // 10 units cover three requests of 3
    assert_eq!(succeeded, 3);
    assert_eq!(total_stock(&pool, &producto).await, dec(1));
    assert!(
        lot_quantities(&pool, &producto)
            .await
            .iter()
            .all(|(_, cantidad)| !cantidad.is_sign_negative())
    );
    assert_eq!(veces_donado(&pool, &iap).await, 3);
}

// ============================================================================
// Counter and institution checks
// ============================================================================

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_counter_increments_once_per_event() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let arroz = seed_producto(&pool).await;
    let frijol = seed_producto(&pool).await;
    let arroz_lots = seed_lots(&pool, &ctx, &arroz, &[dec(2), dec(2)]).await;
    seed_lots(&pool, &ctx, &frijol, &[dec(5)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;
    let service = RecordingService::new(&pool);

    service
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![DetalleAsignacionInput {
                    inventario_id: arroz_lots[0],
                    cantidad: dec(3),
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(veces_donado(&pool, &iap).await, 1);

    // Two products, three drawn lines, one event
    let entrega = service
        .record_entrega(
            &ctx,
            &CreateEntregaInput {
                iap_id: iap.id,
                detalles: vec![
                    DetalleEntregaInput {
                        nombre_producto: arroz.nombre.to_uppercase(),
                        cantidad: dec(1),
                    },
                    DetalleEntregaInput {
                        nombre_producto: format!("  {}  ", frijol.nombre),
                        cantidad: dec(2),
                    },
                ],
            },
        )
        .await
        .unwrap();
    assert_eq!(entrega.detalles.len(), 2);
    assert_eq!(veces_donado(&pool, &iap).await, 2);

    assert_eq!(total_stock(&pool, &arroz).await, dec(0));
    assert_eq!(total_stock(&pool, &frijol).await, dec(3));
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_inactive_institution_is_rejected() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[dec(5)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    sqlx::query("UPDATE japem.iap SET estatus = 'inactiva' WHERE id = $1")
        .bind(iap.id.as_i32())
        .execute(&pool)
        .await
        .unwrap();

    let result = RecordingService::new(&pool)
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![DetalleAsignacionInput {
                    inventario_id: lots[0],
                    cantidad: dec(1),
                }],
            },
        )
        .await;

    assert!(matches!(result, Err(StockError::InstitutionInactive(id)) if id == iap.id));
    assert_eq!(total_stock(&pool, &producto).await, dec(5));
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_unknown_product_name_is_rejected() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    let result = RecordingService::new(&pool)
        .record_entrega(
            &ctx,
            &CreateEntregaInput {
                iap_id: iap.id,
                detalles: vec![DetalleEntregaInput {
                    nombre_producto: "producto que no existe".to_owned(),
                    cantidad: dec(1),
                }],
            },
        )
        .await;

    assert!(matches!(result, Err(StockError::ProductNotFound(_))));
    assert_eq!(veces_donado(&pool, &iap).await, 0);
}

// ============================================================================
// Conservation, delivery status and history
// ============================================================================

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_quantities_are_conserved() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[dec(7), Decimal::new(25, 1)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;
    let service = RecordingService::new(&pool);

    let asignacion = service
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![DetalleAsignacionInput {
                    inventario_id: lots[0],
                    cantidad: Decimal::new(85, 1),
                }],
            },
        )
        .await
        .unwrap();
    let entrega = service
        .record_entrega(
            &ctx,
            &CreateEntregaInput {
                iap_id: iap.id,
                detalles: vec![DetalleEntregaInput {
                    nombre_producto: producto.nombre.clone(),
                    cantidad: Decimal::new(5, 1),
                }],
            },
        )
        .await
        .unwrap();

    let moved: Decimal = asignacion
        .detalles
        .iter()
        .map(|d| d.cantidad)
        .chain(entrega.detalles.iter().map(|d| d.cantidad))
        .sum();
    let remaining = total_stock(&pool, &producto).await;

    assert_eq!(moved + remaining, Decimal::new(95, 1));
    assert_eq!(remaining, Decimal::new(5, 1));
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_request_equal_to_total_stock_empties_every_lot() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[qty("1.250"), dec(4), qty("0.750")]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    let recorded = RecordingService::new(&pool)
        .record_entrega(
            &ctx,
            &CreateEntregaInput {
                iap_id: iap.id,
                detalles: vec![DetalleEntregaInput {
                    nombre_producto: producto.nombre.clone(),
                    cantidad: dec(6),
                }],
            },
        )
        .await
        .unwrap();

    let draws: Vec<_> = recorded
        .detalles
        .iter()
        .map(|d| (d.inventario_id, d.cantidad))
        .collect();
    assert_eq!(
        draws,
        vec![(lots[0], qty("1.25")), (lots[1], dec(4)), (lots[2], qty("0.75"))]
    );
    assert!(
        lot_quantities(&pool, &producto)
            .await
            .iter()
            .all(|(_, cantidad)| cantidad.is_zero())
    );
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_sub_unit_draws_span_lots() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[qty("0.250"), qty("0.125")]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    let recorded = RecordingService::new(&pool)
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![DetalleAsignacionInput {
                    inventario_id: lots[0],
                    cantidad: qty("0.3"),
                }],
            },
        )
        .await
        .unwrap();

    let draws: Vec<_> = recorded
        .detalles
        .iter()
        .map(|d| (d.inventario_id, d.cantidad))
        .collect();
    assert_eq!(draws, vec![(lots[0], qty("0.25")), (lots[1], qty("0.05"))]);
    assert_eq!(
        lot_quantities(&pool, &producto).await,
        vec![(lots[0], dec(0)), (lots[1], qty("0.075"))]
    );
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_column_precision_extremes_are_conserved() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let largest = qty("99999999999.999");
    let lots = seed_lots(&pool, &ctx, &producto, &[largest, qty("0.002")]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;
    let service = RecordingService::new(&pool);

    let smallest = service
        .record_entrega(
            &ctx,
            &CreateEntregaInput {
                iap_id: iap.id,
                detalles: vec![DetalleEntregaInput {
                    nombre_producto: producto.nombre.clone(),
                    cantidad: qty("0.001"),
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(smallest.detalles[0].cantidad, qty("0.001"));

    let bulk = service
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![DetalleAsignacionInput {
                    inventario_id: lots[0],
                    cantidad: qty("99999999999.999"),
                }],
            },
        )
        .await
        .unwrap();

    let draws: Vec<_> = bulk
        .detalles
        .iter()
        .map(|d| (d.inventario_id, d.cantidad))
        .collect();
    assert_eq!(draws, vec![(lots[0], qty("99999999999.998")), (lots[1], qty("0.001"))]);
    assert_eq!(
        lot_quantities(&pool, &producto).await,
        vec![(lots[0], dec(0)), (lots[1], qty("0.001"))]
    );
    let moved: Decimal = smallest
        .detalles
        .iter()
        .map(|d| d.cantidad)
        .chain(bulk.detalles.iter().map(|d| d.cantidad))
        .sum();
    assert_eq!(moved + total_stock(&pool, &producto).await, largest + qty("0.002"));
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_quantities_finer_than_the_column_are_rejected() {
    let pool = test_pool().await;
    let (ctx, token) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[dec(5)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;
    let app = app_with_pool(pool.clone());

    let (status, body) = post_json(
        &app,
        &token,
        "/distribucion",
        &json!({
            "iap_id": iap.id,
            "detalles": [{ "inventario_id": lots[0], "cantidad": "1.0005" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["detalles[0].cantidad"].is_array());

    let (status, body) = post_json(
        &app,
        &token,
        "/entregas",
        &json!({
            "iap_id": iap.id,
            "detalles": [{ "nombre_producto": producto.nombre, "cantidad": "0.0001" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["detalles[0].cantidad"].is_array());

    // Trailing zeros are not extra precision.
    let (status, _) = post_json(
        &app,
        &token,
        "/distribucion",
        &json!({
            "iap_id": iap.id,
            "detalles": [{ "inventario_id": lots[0], "cantidad": "1.5000" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(lot_quantities(&pool, &producto).await, vec![(lots[0], qty("3.5"))]);
    assert_eq!(asignaciones_for(&pool, &iap).await, 1);
    assert_eq!(veces_donado(&pool, &iap).await, 1);
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_mark_delivered_once() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[dec(5)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;

    let recorded = RecordingService::new(&pool)
        .record_asignacion(
            &ctx,
            &CreateAsignacionInput {
                iap_id: iap.id,
                detalles: vec![DetalleAsignacionInput {
                    inventario_id: lots[0],
                    cantidad: dec(2),
                }],
            },
        )
        .await
        .unwrap();

    let repo = AsignacionRepository::new(&pool);
    let delivered = repo.mark_delivered(recorded.asignacion.id).await.unwrap();
    assert_eq!(delivered.estatus, AsignacionEstatus::Entregada);
    assert!(delivered.entregada_at.is_some());

    let again = repo.mark_delivered(recorded.asignacion.id).await;
    assert!(matches!(again, Err(RepositoryError::Conflict(_))));

    // Handover moves no stock and is not a new event
    assert_eq!(total_stock(&pool, &producto).await, dec(3));
    assert_eq!(veces_donado(&pool, &iap).await, 1);
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_history_is_newest_first_and_reads_are_stable() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let lots = seed_lots(&pool, &ctx, &producto, &[dec(10)]).await;
    let iap = seed_iap(&pool, "despensa", false, false).await;
    let service = RecordingService::new(&pool);

    let mut ids = Vec::new();
    for cantidad in [dec(1), dec(2)] {
        let recorded = service
            .record_asignacion(
                &ctx,
                &CreateAsignacionInput {
                    iap_id: iap.id,
                    detalles: vec![DetalleAsignacionInput {
                        inventario_id: lots[0],
                        cantidad,
                    }],
                },
            )
            .await
            .unwrap();
        ids.push(recorded.asignacion.id);
    }
    service
        .record_entrega(
            &ctx,
            &CreateEntregaInput {
                iap_id: iap.id,
                detalles: vec![DetalleEntregaInput {
                    nombre_producto: producto.nombre.clone(),
                    cantidad: dec(1),
                }],
            },
        )
        .await
        .unwrap();

    let filter = HistorialFilter {
        iap_id: Some(iap.id),
        limit: None,
    };
    let repo = AsignacionRepository::new(&pool);
    let history = repo.history(&filter).await.unwrap();
    let order: Vec<_> = history.iter().map(|h| h.asignacion_id).collect();
    assert_eq!(order, vec![ids[1], ids[0]]);
    assert!(history.iter().all(|h| h.iap_nombre == iap.nombre));

    let entregas = EntregaRepository::new(&pool).history(&filter).await.unwrap();
    assert_eq!(entregas.len(), 1);

    // Reading twice changes nothing
    let first = repo.get_with_lines(ids[0]).await.unwrap().unwrap();
    let second = repo.get_with_lines(ids[0]).await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(total_stock(&pool, &producto).await, dec(6));
}

#[tokio::test]
#[ignore = "Requires JAPEM_TEST_DATABASE_URL"]
async fn test_aggregated_inventory_is_read_only() {
    let pool = test_pool().await;
    let (ctx, _) = seed_user(&pool, UserRole::Operador).await;
    let producto = seed_producto(&pool).await;
    let vacio = seed_producto(&pool).await;
    seed_lots(&pool, &ctx, &producto, &[dec(4), dec(6)]).await;

    let repo = InventoryLotRepository::new(&pool);
    let row_for = |rows: &[japem_api::models::InventarioAgregado]| {
        rows.iter()
            .find(|row| row.producto_id == producto.id)
            .map(|row| (row.cantidad_total, row.lotes))
    };

    let first = repo.aggregated_stock().await.unwrap();
    let second = repo.aggregated_stock().await.unwrap();

    assert_eq!(row_for(&first), Some((dec(10), 2)));
    assert_eq!(row_for(&first), row_for(&second));
    // Products without stock are not listed
    assert!(first.iter().all(|row| row.producto_id != vacio.id));
    assert_eq!(total_stock(&pool, &producto).await, dec(10));
}
