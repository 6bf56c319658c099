//! Tariff ladder: tiered rent rates keyed by place, unit and subscription flag.

use serde::{Deserialize, Serialize};

use crate::domain::{Place, RentUnit};

/// One row of the rent-rate ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RateTier {
    pub id: i64,
    pub place: Place,
    pub unit: RentUnit,
    /// Whether this tier prices subscription-covered quantity.
    pub with_sub: bool,
    /// Lower bound, inclusive, at least 1.
    pub min_qty: i32,
    /// Upper bound, inclusive. `None` means open-ended.
    pub max_qty: Option<i32>,
    /// Per-unit materials cost required for `price_with`.
    pub threshold: f64,
    /// Per-unit price when the materials threshold is met.
    pub price_with: f64,
    /// Per-unit price when the master brings own materials.
    pub price_own: f64,
    pub active: bool,
}

impl RateTier {
    /// Whether `[min_qty, max_qty]` contains `qty`.
    pub fn covers(&self, qty: i32) -> bool {
        self.min_qty <= qty && self.max_qty.map_or(true, |max| qty <= max)
    }

    /// Whether this tier belongs to the given ladder key.
    pub fn matches(&self, place: Place, unit: RentUnit, with_sub: bool) -> bool {
        self.place == place && self.unit == unit && self.with_sub == with_sub
    }

    /// Range label such as `1-30` or `51+`.
    pub fn range_label(&self) -> String {
        match self.max_qty {
            Some(max) => format!("{}-{}", self.min_qty, max),
            None => format!("{}+", self.min_qty),
        }
    }
}

/// Pick the tier for `qty`.
///
/// Among active tiers of the `(place, unit, with_sub)` ladder that cover
/// `qty`, the one with the greatest `min_qty` wins. This is the same rule the
/// store applies with `ORDER BY min_qty DESC LIMIT 1`.
pub fn select_tier(
    tiers: &[RateTier],
    place: Place,
    unit: RentUnit,
    with_sub: bool,
    qty: i32,
) -> Option<&RateTier> {
    tiers
        .iter()
        .filter(|t| t.active && t.matches(place, unit, with_sub) && t.covers(qty))
        .max_by_key(|t| t.min_qty)
}

/// All tiers of one `(place, unit)` pair, both subscription flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    pub place: Place,
    pub unit: RentUnit,
    tiers: Vec<RateTier>,
}

impl Ladder {
    /// Build a ladder, dropping tiers that belong to another `(place, unit)`.
    pub fn new(place: Place, unit: RentUnit, tiers: Vec<RateTier>) -> Self {
        let tiers = tiers
            .into_iter()
            .filter(|t| t.place == place && t.unit == unit)
            .collect();
        Self { place, unit, tiers }
    }

    /// Look up the tier for a pricing key.
    pub fn find(&self, with_sub: bool, qty: i32) -> Option<&RateTier> {
        select_tier(&self.tiers, self.place, self.unit, with_sub, qty)
    }

    pub fn tiers(&self) -> &[RateTier] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn tier(
    id: i64,
    with_sub: bool,
    min_qty: i32,
    max_qty: Option<i32>,
    threshold: f64,
    price_with: f64,
    price_own: f64,
) -> RateTier {
    RateTier {
        id,
        place: Place::Hall,
        unit: RentUnit::Hour,
        with_sub,
        min_qty,
        max_qty,
        threshold,
        price_with,
        price_own,
        active: true,
    }
}
