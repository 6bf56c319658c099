//! Splitting a rent quantity across monthly subscription buckets.

use serde::{Deserialize, Serialize};

/// Remaining capacity of one active subscription bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub subscription_id: i64,
    /// Nominal monthly quantity, used as the tier lookup key.
    pub plan_limit: i32,
    pub total_qty: i32,
    pub used_qty: i32,
}

impl Bucket {
    /// Quantity still available in this bucket.
    pub fn left(&self) -> i32 {
        (self.total_qty - self.used_qty).max(0)
    }
}

/// A contiguous slice of a rent session sharing one tier lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPart {
    pub with_sub: bool,
    pub qty: i32,
    /// Covering subscription, set iff `with_sub`.
    pub subscription_id: Option<i64>,
    /// Tier lookup key: the plan limit for covered parts, the part quantity otherwise.
    pub sub_limit_for_pricing: i32,
}

impl SessionPart {
    /// A part covered by a subscription bucket.
    pub fn covered(bucket: &Bucket, qty: i32) -> Self {
        Self {
            with_sub: true,
            qty,
            subscription_id: Some(bucket.subscription_id),
            sub_limit_for_pricing: bucket.plan_limit,
        }
    }

    /// A part paid at the regular rate.
    pub fn uncovered(qty: i32) -> Self {
        Self {
            with_sub: false,
            qty,
            subscription_id: None,
            sub_limit_for_pricing: qty,
        }
    }
}

/// Split `qty` across `buckets` in the given (FIFO) order.
///
/// Each bucket contributes `min(remaining, left)`; whatever no bucket covers
/// ends up in one trailing uncovered part. Empty buckets contribute nothing.
pub fn split_quantity(qty: i32, buckets: &[Bucket]) -> Vec<SessionPart> {
    let mut parts = Vec::new();
    let mut remaining = qty.max(0);

    for bucket in buckets {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(bucket.left());
        if take > 0 {
            parts.push(SessionPart::covered(bucket, take));
            remaining -= take;
        }
    }

    if remaining > 0 {
        parts.push(SessionPart::uncovered(remaining));
    }

    parts
}
