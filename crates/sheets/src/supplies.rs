//! Supply history export.

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};

use crate::cell::{write_header, write_preamble};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct SupplyRow {
    pub created_at: DateTime<Utc>,
    pub material_id: i64,
    pub material: String,
    pub unit: String,
    pub qty: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub actor: String,
}

const HEADER: [&str; 8] = [
    "date",
    "material_id",
    "material",
    "unit",
    "qty",
    "unit_cost",
    "total_cost",
    "received_by",
];

/// Render supplies of one warehouse, dates shown in `offset`.
pub fn write_supplies(
    warehouse_id: i64,
    warehouse_name: &str,
    rows: &[SupplyRow],
    offset: chrono::FixedOffset,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Supplies")?;

    write_preamble(sheet, &bold, warehouse_id, warehouse_name)?;
    write_header(sheet, &bold, 1, &HEADER)?;

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 2;
        let date = row.created_at.with_timezone(&offset).format("%d.%m.%Y %H:%M");
        sheet.write_string(r, 0, date.to_string())?;
        sheet.write_number(r, 1, row.material_id as f64)?;
        sheet.write_string(r, 2, &row.material)?;
        sheet.write_string(r, 3, &row.unit)?;
        sheet.write_number(r, 4, row.qty)?;
        sheet.write_number(r, 5, row.unit_cost)?;
        sheet.write_number(r, 6, row.total_cost)?;
        sheet.write_string(r, 7, &row.actor)?;
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplies_export_is_a_workbook() {
        let rows = vec![SupplyRow {
            created_at: Utc::now(),
            material_id: 3,
            material: "Wax".into(),
            unit: "g".into(),
            qty: 5.0,
            unit_cost: 100.0,
            total_cost: 500.0,
            actor: "Admin".into(),
        }];
        let offset = chrono::FixedOffset::east_opt(3 * 3600).unwrap();
        let bytes = write_supplies(1, "Main", &rows, offset).unwrap();
        // xlsx files are zip archives.
        assert_eq!(&bytes[..2], b"PK");
    }
}
