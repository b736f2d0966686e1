//! Transactional recording of allocations, deliveries and donations.
//!
//! Each operation runs in one database transaction. Returning early with an
//! error drops the transaction, which rolls back the header, every line and
//! every lot decrement made so far.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use japem_core::IapId;

use super::StockError;
use super::allocator::allocate;
use crate::db::{asignaciones, donaciones, entregas, iaps, inventario, productos};
use crate::models::iap::Iap;
use crate::models::producto::Producto;
use crate::models::{
    AsignacionConDetalles, CreateAsignacionInput, CreateDonacionInput, CreateEntregaInput,
    DonacionConLotes, EntregaConDetalles, RequestContext,
};

/// A request line resolved to its catalog product.
struct ResolvedLine {
    producto: Producto,
    cantidad: Decimal,
}

/// Records stock movements against institutions.
pub struct RecordingService<'a> {
    pool: &'a PgPool,
}

impl<'a> RecordingService<'a> {
    /// Create a new recording service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Commit stock to an institution as a pending allocation.
    ///
    /// Each line names a lot; the lot identifies the product and the FIFO
    /// allocator draws from all lots of that product. The institution's
    /// `veces_donado` goes up by one regardless of the number of lines.
    ///
    /// # Errors
    ///
    /// Returns `StockError::InstitutionNotFound` / `InstitutionInactive` if the
    /// institution can't receive goods.
    /// Returns `StockError::LotNotFound` if a referenced lot doesn't exist.
    /// Returns `StockError::InsufficientStock` if any line can't be covered.
    /// Returns `StockError::Repository` for database errors.
    #[instrument(
        skip(self, ctx, input),
        fields(iap_id = %input.iap_id, usuario_id = %ctx.usuario_id, lines = input.detalles.len())
    )]
    pub async fn record_asignacion(
        &self,
        ctx: &RequestContext,
        input: &CreateAsignacionInput,
    ) -> Result<AsignacionConDetalles, StockError> {
        let mut tx = self.pool.begin().await?;

        let iap = lock_active_iap(&mut tx, input.iap_id).await?;

        let mut lines = Vec::with_capacity(input.detalles.len());
        for detalle in &input.detalles {
            let producto_id = inventario::product_of_lot(&mut tx, detalle.inventario_id)
                .await?
                .ok_or(StockError::LotNotFound(detalle.inventario_id))?;
            let producto = productos::find_by_id(&mut tx, producto_id)
                .await?
                .ok_or_else(|| StockError::product_id_not_found(producto_id))?;
            lines.push(ResolvedLine {
                producto,
                cantidad: detalle.cantidad,
            });
        }
        sort_for_locking(&mut lines);

        let header = asignaciones::insert_header(&mut tx, iap.id, Some(ctx.usuario_id)).await?;

        let mut detalles = Vec::new();
        for line in &lines {
            for draw in allocate(&mut tx, &line.producto, line.cantidad).await? {
                let detalle = asignaciones::insert_line(
                    &mut tx,
                    header.id,
                    draw.lote_id,
                    &line.producto.nombre,
                    draw.cantidad,
                )
                .await?;
                detalles.push(detalle);
            }
        }

        let veces_donado = iaps::increment_veces_donado(&mut tx, iap.id).await?;

        tx.commit().await?;

        info!(
            asignacion_id = %header.id,
            iap = %iap.nombre,
            lines = detalles.len(),
            veces_donado,
            "Recorded allocation"
        );

        Ok(AsignacionConDetalles {
            asignacion: header,
            detalles,
        })
    }

    /// Record a direct delivery to an institution.
    ///
    /// Lines name products by free text; each name must resolve to exactly
    /// one catalog product (case-insensitive). The institution's
    /// `veces_donado` goes up by one regardless of the number of lines.
    ///
    /// # Errors
    ///
    /// Returns `StockError::InstitutionNotFound` / `InstitutionInactive` if the
    /// institution can't receive goods.
    /// Returns `StockError::ProductNotFound` if a name matches no product.
    /// Returns `StockError::InsufficientStock` if any line can't be covered.
    /// Returns `StockError::Repository` for database errors.
    #[instrument(
        skip(self, ctx, input),
        fields(iap_id = %input.iap_id, usuario_id = %ctx.usuario_id, lines = input.detalles.len())
    )]
    pub async fn record_entrega(
        &self,
        ctx: &RequestContext,
        input: &CreateEntregaInput,
    ) -> Result<EntregaConDetalles, StockError> {
        let mut tx = self.pool.begin().await?;

        let iap = lock_active_iap(&mut tx, input.iap_id).await?;

        let mut lines = Vec::with_capacity(input.detalles.len());
        for detalle in &input.detalles {
            let producto = productos::find_by_name(&mut tx, &detalle.nombre_producto)
                .await?
                .ok_or_else(|| {
                    StockError::ProductNotFound(detalle.nombre_producto.trim().to_owned())
                })?;
            lines.push(ResolvedLine {
                producto,
                cantidad: detalle.cantidad,
            });
        }
        sort_for_locking(&mut lines);

        let header = entregas::insert_header(&mut tx, iap.id, Some(ctx.usuario_id)).await?;

        let mut detalles = Vec::new();
        for line in &lines {
            for draw in allocate(&mut tx, &line.producto, line.cantidad).await? {
                let detalle = entregas::insert_line(
                    &mut tx,
                    header.id,
                    draw.lote_id,
                    &line.producto.nombre,
                    draw.cantidad,
                )
                .await?;
                detalles.push(detalle);
            }
        }

        let veces_donado = iaps::increment_veces_donado(&mut tx, iap.id).await?;

        tx.commit().await?;

        info!(
            entrega_id = %header.id,
            iap = %iap.nombre,
            lines = detalles.len(),
            veces_donado,
            "Recorded delivery"
        );

        Ok(EntregaConDetalles {
            entrega: header,
            detalles,
        })
    }

    /// Record a donation, creating one inventory lot per product line.
    ///
    /// # Errors
    ///
    /// Returns `StockError::ProductNotFound` if a line names an unknown product.
    /// Returns `StockError::Repository` for database errors.
    #[instrument(
        skip(self, ctx, input),
        fields(usuario_id = %ctx.usuario_id, lines = input.productos.len())
    )]
    pub async fn record_donacion(
        &self,
        ctx: &RequestContext,
        input: &CreateDonacionInput,
    ) -> Result<DonacionConLotes, StockError> {
        let mut tx = self.pool.begin().await?;

        let donacion = donaciones::insert_donacion(
            &mut tx,
            input.fecha_donacion,
            input.observaciones.as_deref(),
            Some(ctx.usuario_id),
        )
        .await?;

        for linea in &input.productos {
            if productos::find_by_id(&mut tx, linea.producto_id).await?.is_none() {
                return Err(StockError::product_id_not_found(linea.producto_id));
            }
            inventario::insert_lot(
                &mut tx,
                &inventario::NewLot {
                    producto_id: linea.producto_id,
                    donacion_id: Some(donacion.id),
                    cantidad: linea.cantidad,
                    precio_unitario: linea.precio_unitario,
                    precio_mercado: linea.precio_mercado,
                    fecha_caducidad: linea.fecha_caducidad,
                },
            )
            .await?;
        }

        let recorded = donaciones::load_with_lots(&mut tx, donacion.id)
            .await?
            .ok_or_else(|| {
                StockError::Repository(crate::db::RepositoryError::DataCorruption(format!(
                    "donation {} vanished inside its own transaction",
                    donacion.id
                )))
            })?;

        tx.commit().await?;

        info!(
            donacion_id = %donacion.id,
            lotes = recorded.lotes.len(),
            "Recorded donation"
        );

        Ok(recorded)
    }
}

/// Lock the institution row and check it can receive goods.
async fn lock_active_iap(conn: &mut PgConnection, id: IapId) -> Result<Iap, StockError> {
    let iap = iaps::lock_for_update(conn, id)
        .await?
        .ok_or(StockError::InstitutionNotFound(id))?;

    if !iap.estatus.is_active() {
        return Err(StockError::InstitutionInactive(id));
    }

    Ok(iap)
}

/// Concurrent multi-line requests take lot locks in the same order.
fn sort_for_locking(lines: &mut [ResolvedLine]) {
    lines.sort_by_key(|line| line.producto.id);
}
