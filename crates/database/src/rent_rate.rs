//! Rent-rate ladder storage and tier lookup.

use salon_core::{Place, RateTier, RentUnit};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{DatabaseError, Result};
use crate::validation::{validate_non_negative, validate_range};

const COLUMNS: &str =
    "id, place, unit, with_sub, min_qty, max_qty, threshold, price_with, price_own, active";

/// A tier to insert or overwrite, keyed by `(place, unit, with_sub, min_qty)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTier {
    pub place: Place,
    pub unit: RentUnit,
    pub with_sub: bool,
    pub min_qty: i32,
    pub max_qty: Option<i32>,
    pub threshold: f64,
    pub price_with: f64,
    pub price_own: f64,
}

/// Partial tier update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierPatch {
    pub max_qty: Option<i32>,
    pub threshold: Option<f64>,
    pub price_with: Option<f64>,
    pub price_own: Option<f64>,
    pub active: Option<bool>,
}

impl TierPatch {
    pub fn is_empty(&self) -> bool {
        self == &TierPatch::default()
    }
}

/// The active tier covering `qty`; the greatest `min_qty` wins on overlap.
pub async fn find_tier(
    pool: &PgPool,
    place: Place,
    unit: RentUnit,
    with_sub: bool,
    qty: i32,
) -> Result<Option<RateTier>> {
    let tier = sqlx::query_as::<_, RateTier>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM rent_rates
        WHERE place = $1 AND unit = $2 AND with_sub = $3 AND active
          AND min_qty <= $4 AND (max_qty IS NULL OR $4 <= max_qty)
        ORDER BY min_qty DESC
        LIMIT 1
        "#
    ))
    .bind(place)
    .bind(unit)
    .bind(with_sub)
    .bind(qty)
    .fetch_optional(pool)
    .await?;

    Ok(tier)
}

/// Both ladders (with and without subscription) of a `(place, unit)` pair.
pub async fn list_ladder(pool: &PgPool, place: Place, unit: RentUnit) -> Result<Vec<RateTier>> {
    let rows = sqlx::query_as::<_, RateTier>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM rent_rates
        WHERE place = $1 AND unit = $2
        ORDER BY with_sub DESC, min_qty
        "#
    ))
    .bind(place)
    .bind(unit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Tiers of one ladder, in ascending `min_qty`.
pub async fn list_tiers(
    pool: &PgPool,
    place: Place,
    unit: RentUnit,
    with_sub: bool,
) -> Result<Vec<RateTier>> {
    let rows = sqlx::query_as::<_, RateTier>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM rent_rates
        WHERE place = $1 AND unit = $2 AND with_sub = $3
        ORDER BY min_qty
        "#
    ))
    .bind(place)
    .bind(unit)
    .bind(with_sub)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every tier, for export.
pub async fn list_all_tiers(pool: &PgPool) -> Result<Vec<RateTier>> {
    let rows = sqlx::query_as::<_, RateTier>(&format!(
        "SELECT {COLUMNS} FROM rent_rates ORDER BY place, unit, with_sub DESC, min_qty"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_tier(pool: &PgPool, id: i64) -> Result<RateTier> {
    sqlx::query_as::<_, RateTier>(&format!("SELECT {COLUMNS} FROM rent_rates WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Tier", id))
}

/// Insert a tier or overwrite the one with the same key. The result is active.
pub async fn upsert_tier(pool: &PgPool, tier: &NewTier) -> Result<RateTier> {
    validate_range(tier.min_qty, tier.max_qty)?;
    validate_non_negative("threshold", tier.threshold)?;
    validate_non_negative("price with materials", tier.price_with)?;
    validate_non_negative("price with own materials", tier.price_own)?;

    let row = sqlx::query_as::<_, RateTier>(&format!(
        r#"
        INSERT INTO rent_rates
            (place, unit, with_sub, min_qty, max_qty, threshold, price_with, price_own)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (place, unit, with_sub, min_qty) DO UPDATE SET
            max_qty = EXCLUDED.max_qty,
            threshold = EXCLUDED.threshold,
            price_with = EXCLUDED.price_with,
            price_own = EXCLUDED.price_own,
            active = TRUE
        RETURNING {COLUMNS}
        "#
    ))
    .bind(tier.place)
    .bind(tier.unit)
    .bind(tier.with_sub)
    .bind(tier.min_qty)
    .bind(tier.max_qty)
    .bind(tier.threshold)
    .bind(tier.price_with)
    .bind(tier.price_own)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Apply a partial update.
pub async fn update_tier(pool: &PgPool, id: i64, patch: &TierPatch) -> Result<RateTier> {
    let current = get_tier(pool, id).await?;
    if patch.is_empty() {
        return Ok(current);
    }

    validate_range(current.min_qty, patch.max_qty.or(current.max_qty))?;
    for (field, value) in [
        ("threshold", patch.threshold),
        ("price with materials", patch.price_with),
        ("price with own materials", patch.price_own),
    ] {
        if let Some(value) = value {
            validate_non_negative(field, value)?;
        }
    }

    sqlx::query_as::<_, RateTier>(&format!(
        r#"
        UPDATE rent_rates SET
            max_qty = COALESCE($2, max_qty),
            threshold = COALESCE($3, threshold),
            price_with = COALESCE($4, price_with),
            price_own = COALESCE($5, price_own),
            active = COALESCE($6, active)
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.max_qty)
    .bind(patch.threshold)
    .bind(patch.price_with)
    .bind(patch.price_own)
    .bind(patch.active)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Tier", id))
}

pub async fn delete_tier(pool: &PgPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM rent_rates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Tier", id));
    }

    Ok(())
}
