//! Rules for applying uploaded spreadsheets.
//!
//! Files describe one warehouse. A row naming another warehouse rejects the
//! whole file before anything is written. An empty quantity means zero for
//! stock reconciliation; an empty price or tier cell leaves the value as is.

use database::TierPatch;
use sheets::{PriceSheet, RateRow, StockSheet};

use crate::error::{DialogError, Result};

/// Differences smaller than this are treated as equal.
const EPSILON: f64 = 1e-9;

/// The stock write that moves a balance to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    Receive(f64),
    WriteOff(f64),
}

/// Adjustment taking `current` to `target`, or `None` when they agree.
pub fn reconcile(current: f64, target: f64) -> Option<Adjustment> {
    let delta = target - current;
    if delta > EPSILON {
        Some(Adjustment::Receive(delta))
    } else if delta < -EPSILON {
        Some(Adjustment::WriteOff(-delta))
    } else {
        None
    }
}

fn check_warehouse(line: usize, row_wh: i64, file_wh: i64) -> Result<()> {
    if row_wh != file_wh {
        return Err(DialogError::validation(format!(
            "Row {line}: warehouse {row_wh} differs from the file warehouse {file_wh}. Nothing was imported."
        )));
    }
    Ok(())
}

/// Target balance of one material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockTarget {
    pub material_id: i64,
    pub qty: f64,
}

pub fn stock_targets(sheet: &StockSheet) -> Result<Vec<StockTarget>> {
    sheet
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            check_warehouse(i + 1, row.warehouse_id, sheet.warehouse_id)?;
            Ok(StockTarget {
                material_id: row.material_id,
                qty: row.qty.unwrap_or(0.0),
            })
        })
        .collect()
}

/// `(material_id, price)` for every row with a price.
pub fn price_updates(sheet: &PriceSheet) -> Result<Vec<(i64, f64)>> {
    let mut updates = Vec::new();
    for (i, row) in sheet.rows.iter().enumerate() {
        check_warehouse(i + 1, row.warehouse_id, sheet.warehouse_id)?;
        if let Some(price) = row.price {
            if price < 0.0 {
                return Err(DialogError::validation(format!(
                    "Row {}: price must not be negative.",
                    i + 1
                )));
            }
            updates.push((row.material_id, price));
        }
    }
    Ok(updates)
}

/// A supply line read from a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Receipt {
    pub material_id: i64,
    pub qty: f64,
    /// `None` means the material's current price.
    pub unit_cost: Option<f64>,
}

/// Supply lines from a price-layout file: `qty` is the received amount and
/// `price` the unit cost. Rows without a quantity are skipped.
pub fn supply_receipts(sheet: &PriceSheet) -> Result<Vec<Receipt>> {
    let mut receipts = Vec::new();
    for (i, row) in sheet.rows.iter().enumerate() {
        check_warehouse(i + 1, row.warehouse_id, sheet.warehouse_id)?;
        let Some(qty) = row.qty else { continue };
        if qty == 0.0 {
            continue;
        }
        if qty < 0.0 || row.price.is_some_and(|p| p < 0.0) {
            return Err(DialogError::validation(format!(
                "Row {}: quantity must be positive and cost non-negative.",
                i + 1
            )));
        }
        receipts.push(Receipt {
            material_id: row.material_id,
            qty,
            unit_cost: row.price,
        });
    }
    Ok(receipts)
}

/// Tier patches for every row that changes something.
pub fn tier_patches(rows: &[RateRow]) -> Vec<(i64, TierPatch)> {
    rows.iter()
        .filter(|row| !row.is_blank())
        .map(|row| {
            (
                row.id,
                TierPatch {
                    max_qty: row.max_qty,
                    threshold: row.threshold,
                    price_with: row.price_with,
                    price_own: row.price_own,
                    active: row.active,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheets::{PriceRow, StockRow};

    fn stock_row(warehouse_id: i64, material_id: i64, qty: Option<f64>) -> StockRow {
        StockRow {
            warehouse_id,
            material_id,
            material: String::new(),
            category: String::new(),
            unit: "g".into(),
            qty,
        }
    }

    fn price_row(material_id: i64, qty: Option<f64>, price: Option<f64>) -> PriceRow {
        PriceRow {
            warehouse_id: 1,
            material_id,
            material: String::new(),
            unit: "g".into(),
            qty,
            price,
        }
    }

    #[test]
    fn test_reconcile_direction() {
        // 120 g on hand, file says 200 g.
        assert_eq!(reconcile(120.0, 200.0), Some(Adjustment::Receive(80.0)));
        assert_eq!(reconcile(-5.0, 0.0), Some(Adjustment::Receive(5.0)));
        assert_eq!(reconcile(10.0, 4.0), Some(Adjustment::WriteOff(6.0)));
        assert_eq!(reconcile(7.0, 7.0), None);
    }

    #[test]
    fn test_empty_stock_cell_means_zero() {
        let sheet = StockSheet {
            warehouse_id: 1,
            rows: vec![stock_row(1, 7, Some(200.0)), stock_row(1, 8, None)],
        };
        let targets = stock_targets(&sheet).unwrap();
        assert_eq!(targets[0], StockTarget { material_id: 7, qty: 200.0 });
        assert_eq!(targets[1].qty, 0.0);
    }

    #[test]
    fn test_foreign_warehouse_rejects_file() {
        let sheet = StockSheet {
            warehouse_id: 1,
            rows: vec![stock_row(1, 7, Some(1.0)), stock_row(2, 8, Some(1.0))],
        };
        let err = stock_targets(&sheet).unwrap_err();
        assert!(err.user_message().contains("Row 2"));
    }

    #[test]
    fn test_empty_price_is_unchanged() {
        let sheet = PriceSheet {
            warehouse_id: 1,
            rows: vec![price_row(7, None, Some(3.5)), price_row(8, None, None)],
        };
        assert_eq!(price_updates(&sheet).unwrap(), vec![(7, 3.5)]);

        let bad = PriceSheet {
            warehouse_id: 1,
            rows: vec![price_row(7, None, Some(-1.0))],
        };
        assert!(price_updates(&bad).is_err());
    }

    #[test]
    fn test_supply_receipts_skip_empty_quantities() {
        let sheet = PriceSheet {
            warehouse_id: 1,
            rows: vec![
                price_row(7, Some(5.0), Some(100.0)),
                price_row(8, None, Some(1.0)),
                price_row(9, Some(0.0), None),
                price_row(10, Some(2.0), None),
            ],
        };
        let receipts = supply_receipts(&sheet).unwrap();
        assert_eq!(receipts.len(), 2);
        assert_eq!(receipts[1].unit_cost, None);

        let bad = PriceSheet {
            warehouse_id: 1,
            rows: vec![price_row(7, Some(-2.0), None)],
        };
        assert!(supply_receipts(&bad).is_err());
    }

    #[test]
    fn test_blank_tier_rows_are_skipped() {
        let rows = vec![
            RateRow {
                id: 1,
                max_qty: None,
                threshold: None,
                price_with: Some(610.0),
                price_own: None,
                active: None,
            },
            RateRow {
                id: 2,
                max_qty: None,
                threshold: None,
                price_with: None,
                price_own: None,
                active: None,
            },
        ];
        let patches = tier_patches(&rows);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, 1);
        assert_eq!(patches[0].1.price_with, Some(610.0));
    }
}
