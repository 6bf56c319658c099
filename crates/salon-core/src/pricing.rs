//! Consumption pricing engine.
//!
//! A rent session is priced part by part. Every part looks up its tier with
//! its pricing key (the plan limit for subscription parts, the quantity
//! otherwise) and draws from one shared materials budget. A part whose
//! threshold is fully covered by the budget is billed at `price_with`,
//! otherwise at `price_own`.

use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};
use crate::split::SessionPart;
use crate::tiers::Ladder;

/// Result for one session part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartQuote {
    pub tier_id: i64,
    pub with_sub: bool,
    pub qty: i32,
    /// Per-unit price applied.
    pub rate: f64,
    pub rent: f64,
    /// Materials cost this part needs to qualify for `price_with`.
    pub need: f64,
    /// Share of the budget this part consumed.
    pub materials_used: f64,
    pub threshold_met: bool,
}

/// Priced session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub rent_total: f64,
    /// Exact materials sum, before rounding.
    pub materials_sum: f64,
    /// Materials sum rounded to the nearest integer, used as the budget.
    pub rounded_materials: f64,
    pub needed_total: f64,
    pub parts: Vec<PartQuote>,
}

impl Quote {
    /// Amount to invoice: rent plus the exact materials sum.
    pub fn total(&self) -> f64 {
        self.rent_total + self.materials_sum
    }

    /// Total quantity across parts.
    pub fn qty(&self) -> i32 {
        self.parts.iter().map(|p| p.qty).sum()
    }

    /// Whether any part is covered by a subscription.
    pub fn with_sub(&self) -> bool {
        self.parts.iter().any(|p| p.with_sub)
    }
}

/// Price a session.
///
/// `parts` must be non-empty and every part must have positive quantity and
/// pricing key. Fails with [`PricingError::TariffMissing`] when a part has
/// no active tier.
pub fn quote(ladder: &Ladder, materials_sum: f64, parts: &[SessionPart]) -> Result<Quote> {
    if parts.is_empty() {
        return Err(PricingError::InvalidInput("session has no parts".into()));
    }
    if !materials_sum.is_finite() || materials_sum < 0.0 {
        return Err(PricingError::InvalidInput(format!(
            "materials sum must be non-negative, got {materials_sum}"
        )));
    }

    let rounded_materials = materials_sum.round();
    let mut budget = rounded_materials;
    let mut rent_total = 0.0;
    let mut needed_total = 0.0;
    let mut priced = Vec::with_capacity(parts.len());

    for part in parts {
        if part.qty <= 0 || part.sub_limit_for_pricing <= 0 {
            return Err(PricingError::InvalidInput(format!(
                "part quantity and pricing key must be positive, got {} / {}",
                part.qty, part.sub_limit_for_pricing
            )));
        }

        let tier = ladder
            .find(part.with_sub, part.sub_limit_for_pricing)
            .ok_or(PricingError::TariffMissing {
                place: ladder.place,
                unit: ladder.unit,
                with_sub: part.with_sub,
                qty: part.sub_limit_for_pricing,
            })?;

        let qty = f64::from(part.qty);
        let need = tier.threshold * qty;
        let materials_used = need.min(budget);
        budget -= materials_used;

        let threshold_met = materials_used >= need;
        let rate = if threshold_met {
            tier.price_with
        } else {
            tier.price_own
        };
        let rent = rate * qty;

        rent_total += rent;
        needed_total += need;
        priced.push(PartQuote {
            tier_id: tier.id,
            with_sub: part.with_sub,
            qty: part.qty,
            rate,
            rent,
            need,
            materials_used,
            threshold_met,
        });
    }

    Ok(Quote {
        rent_total,
        materials_sum,
        rounded_materials,
        needed_total,
        parts: priced,
    })
}
