//! Institution suggestions for a product.
//!
//! Candidates are active institutions whose primary need, complementary need
//! or sector mentions the product. They are ranked certified first, then
//! authorized donees, then least-served (`veces_donado` ascending).

use std::cmp::Reverse;

use sqlx::PgPool;
use tracing::instrument;

use crate::db::{IapRepository, RepositoryError};
use crate::models::iap::Iap;

/// Upper bound on suggestions returned.
pub const MAX_SUGGESTIONS: usize = 5;

/// Build a case-insensitive substring pattern with `LIKE` wildcards escaped.
#[must_use]
pub fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Order candidates and keep the best [`MAX_SUGGESTIONS`].
#[must_use]
pub fn rank_candidates(mut candidates: Vec<Iap>) -> Vec<Iap> {
    candidates.sort_by_key(|iap| {
        (
            Reverse(iap.es_certificada),
            Reverse(iap.es_donataria_autorizada),
            iap.veces_donado,
            iap.id,
        )
    });
    candidates.truncate(MAX_SUGGESTIONS);
    candidates
}

/// Suggest up to five active institutions for `producto`.
///
/// A blank fragment yields no suggestions without touching the database.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
#[instrument(skip(pool))]
pub async fn suggest(pool: &PgPool, producto: &str) -> Result<Vec<Iap>, RepositoryError> {
    let fragment = producto.trim();
    if fragment.is_empty() {
        return Ok(Vec::new());
    }

    let candidates = IapRepository::new(pool)
        .active_matching(&like_pattern(fragment))
        .await?;

    Ok(rank_candidates(candidates))
}
