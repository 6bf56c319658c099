//! Low-stock detection and admin fan-out.

use std::collections::BTreeSet;
use std::fmt::Write;

use database::{inventory, PgPool, StockChange, StockLine};
use salon_core::MaterialUnit;

use crate::error::Result;
use crate::format;

/// Whether a balance needs restocking: any negative balance, under 100 g or
/// ml, or under 5 pieces.
pub fn is_low(unit: MaterialUnit, qty: f64) -> bool {
    if qty < 0.0 {
        return true;
    }
    match unit {
        MaterialUnit::Gram | MaterialUnit::Milliliter => qty < 100.0,
        MaterialUnit::Pcs => qty < 5.0,
        MaterialUnit::Liter | MaterialUnit::Kilogram => false,
    }
}

/// Current lines of every written balance that is now low.
pub async fn low_stock_lines(pool: &PgPool, changes: &[StockChange]) -> Result<Vec<StockLine>> {
    let warehouses: BTreeSet<i64> = changes.iter().map(|c| c.warehouse_id).collect();

    let mut low = Vec::new();
    for warehouse_id in warehouses {
        let ids: Vec<i64> = changes
            .iter()
            .filter(|c| c.warehouse_id == warehouse_id)
            .map(|c| c.material_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let lines = inventory::stock_lines_for(pool, warehouse_id, &ids).await?;
        low.extend(lines.into_iter().filter(|l| is_low(l.unit, l.qty)));
    }
    Ok(low)
}

/// Distinct recipients: the super-admin first, then admins in order.
pub fn recipients(super_admin: i64, admins: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = BTreeSet::from([super_admin]);
    let mut out = vec![super_admin];
    for chat_id in admins {
        if seen.insert(chat_id) {
            out.push(chat_id);
        }
    }
    out
}

pub fn low_stock_text(lines: &[StockLine]) -> String {
    let mut out = String::from("⚠️ Low stock:\n");
    for line in lines {
        let _ = writeln!(out, "• {}", format::stock_line(line));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_thresholds() {
        assert!(is_low(MaterialUnit::Gram, 99.9));
        assert!(!is_low(MaterialUnit::Gram, 100.0));
        assert!(is_low(MaterialUnit::Milliliter, 50.0));
        assert!(is_low(MaterialUnit::Pcs, 4.0));
        assert!(!is_low(MaterialUnit::Pcs, 5.0));
        assert!(!is_low(MaterialUnit::Liter, 0.5));
        assert!(is_low(MaterialUnit::Kilogram, -0.1));
    }

    #[test]
    fn test_recipients_are_deduplicated() {
        assert_eq!(recipients(1, [3, 1, 2, 3]), vec![1, 3, 2]);
        assert_eq!(recipients(1, []), vec![1]);
    }
}
