//! Rent tier layout. Import updates existing tiers by id; empty cells keep the stored value.

use rust_xlsxwriter::{Format, Workbook};
use salon_core::{Place, RateTier, RentUnit};

use crate::cell::{data_rows, open, write_header, write_opt_number, Columns, RowReader};
use crate::error::{Result, SheetError};

/// One tier as read from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub id: i64,
    pub max_qty: Option<i32>,
    pub threshold: Option<f64>,
    pub price_with: Option<f64>,
    pub price_own: Option<f64>,
    pub active: Option<bool>,
}

impl RateRow {
    /// Whether the row changes nothing.
    pub fn is_blank(&self) -> bool {
        self.max_qty.is_none()
            && self.threshold.is_none()
            && self.price_with.is_none()
            && self.price_own.is_none()
            && self.active.is_none()
    }
}

const HEADER: [&str; 10] = [
    "id",
    "place",
    "unit",
    "with_sub",
    "min_qty",
    "max_qty",
    "threshold",
    "price_with",
    "price_own",
    "active",
];

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn write_rates(tiers: &[RateTier]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Rates")?;

    write_header(sheet, &bold, 0, &HEADER)?;

    for (i, tier) in tiers.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_number(r, 0, tier.id as f64)?;
        sheet.write_string(r, 1, tier.place.as_str())?;
        sheet.write_string(r, 2, tier.unit.as_str())?;
        sheet.write_string(r, 3, yes_no(tier.with_sub))?;
        sheet.write_number(r, 4, tier.min_qty)?;
        write_opt_number(sheet, r, 5, tier.max_qty.map(f64::from))?;
        sheet.write_number(r, 6, tier.threshold)?;
        sheet.write_number(r, 7, tier.price_with)?;
        sheet.write_number(r, 8, tier.price_own)?;
        sheet.write_string(r, 9, yes_no(tier.active))?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Parse a rates file.
///
/// `place` and `unit` cells, when present, must name known values; they are
/// informational and not returned.
pub fn read_rates(bytes: &[u8]) -> Result<Vec<RateRow>> {
    let (first_row, rows) = open(bytes)?;
    let header = rows.first().ok_or(SheetError::Empty)?;
    let columns = Columns::locate(
        header,
        &["id"],
        &[
            "place",
            "unit",
            "with_sub",
            "min_qty",
            "max_qty",
            "threshold",
            "price_with",
            "price_own",
            "active",
        ],
    )?;

    let mut parsed = Vec::new();
    for (line, row) in data_rows(first_row, &rows, 1) {
        let reader = RowReader::new(line, row, &columns);

        for (column, ok) in [
            ("place", reader.text("place").parse::<Place>().is_ok()),
            ("unit", reader.text("unit").parse::<RentUnit>().is_ok()),
        ] {
            if !ok && !reader.text(column).is_empty() {
                return Err(SheetError::BadCell {
                    row: reader.line,
                    column,
                    reason: format!("unknown value '{}'", reader.text(column)),
                });
            }
        }

        parsed.push(RateRow {
            id: reader.req_i64("id")?,
            max_qty: reader.opt_i32("max_qty")?,
            threshold: reader.opt_f64("threshold")?,
            price_with: reader.opt_f64("price_with")?,
            price_own: reader.opt_f64("price_own")?,
            active: reader.opt_bool("active")?,
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(id: i64, max_qty: Option<i32>) -> RateTier {
        RateTier {
            id,
            place: Place::Hall,
            unit: RentUnit::Hour,
            with_sub: true,
            min_qty: 1,
            max_qty,
            threshold: 100.0,
            price_with: 600.0,
            price_own: 700.0,
            active: true,
        }
    }

    #[test]
    fn test_rates_file_reads_back_tiers() {
        let bytes = write_rates(&[tier(1, Some(30)), tier(2, None)]).unwrap();
        let rows = read_rates(&bytes).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].max_qty, Some(30));
        assert_eq!(rows[0].price_own, Some(700.0));
        assert_eq!(rows[0].active, Some(true));
        // Open-ended tier leaves max_qty empty, which reads as "unchanged".
        assert_eq!(rows[1].max_qty, None);
        assert!(!rows[1].is_blank());
    }
}
