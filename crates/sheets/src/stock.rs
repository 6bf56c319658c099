//! Stock layout: one warehouse per file, one row per material.
//!
//! ```text
//! warehouse_id | 3        | warehouse | Main
//! warehouse_id | material_id | material | category | unit | qty
//! 3            | 7           | Wax      | Care     | g    | 120
//! ```

use rust_xlsxwriter::{Format, Workbook};

use crate::cell::{
    data_rows, open, preamble_warehouse, write_header, write_preamble, Columns, RowReader,
};
use crate::error::{Result, SheetError};

/// A material balance row.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub warehouse_id: i64,
    pub material_id: i64,
    pub material: String,
    pub category: String,
    pub unit: String,
    /// `None` when the cell is empty.
    pub qty: Option<f64>,
}

/// A parsed stock file.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSheet {
    /// Warehouse named in the preamble row.
    pub warehouse_id: i64,
    pub rows: Vec<StockRow>,
}

const HEADER: [&str; 6] = ["warehouse_id", "material_id", "material", "category", "unit", "qty"];

/// Render the stock of one warehouse.
pub fn write_stock(warehouse_id: i64, warehouse_name: &str, rows: &[StockRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Stock")?;

    write_preamble(sheet, &bold, warehouse_id, warehouse_name)?;
    write_header(sheet, &bold, 1, &HEADER)?;

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 2;
        sheet.write_number(r, 0, row.warehouse_id as f64)?;
        sheet.write_number(r, 1, row.material_id as f64)?;
        sheet.write_string(r, 2, &row.material)?;
        sheet.write_string(r, 3, &row.category)?;
        sheet.write_string(r, 4, &row.unit)?;
        crate::cell::write_opt_number(sheet, r, 5, row.qty)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Parse a stock file. Row warehouse ids are returned as written.
pub fn read_stock(bytes: &[u8]) -> Result<StockSheet> {
    let (first_row, rows) = open(bytes)?;
    let warehouse_id = preamble_warehouse(&rows)?;
    let header = rows.get(1).ok_or(SheetError::MissingColumn("material_id"))?;
    let columns = Columns::locate(header, &["material_id", "qty"], &["warehouse_id", "material", "category", "unit"])?;

    let mut parsed = Vec::new();
    for (line, row) in data_rows(first_row, &rows, 2) {
        let reader = RowReader::new(line, row, &columns);
        parsed.push(StockRow {
            warehouse_id: reader.opt_i64("warehouse_id")?.unwrap_or(warehouse_id),
            material_id: reader.req_i64("material_id")?,
            material: reader.text("material"),
            category: reader.text("category"),
            unit: reader.text("unit"),
            qty: reader.opt_f64("qty")?,
        });
    }

    tracing::debug!(warehouse_id, rows = parsed.len(), "Parsed stock sheet");
    Ok(StockSheet {
        warehouse_id,
        rows: parsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(material_id: i64, qty: Option<f64>) -> StockRow {
        StockRow {
            warehouse_id: 3,
            material_id,
            material: format!("Material {material_id}"),
            category: "Care".into(),
            unit: "g".into(),
            qty,
        }
    }

    #[test]
    fn test_stock_file_keeps_empty_quantities() {
        let bytes = write_stock(3, "Main", &[row(7, Some(120.5)), row(8, None)]).unwrap();
        let sheet = read_stock(&bytes).unwrap();

        assert_eq!(sheet.warehouse_id, 3);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].qty, Some(120.5));
        assert_eq!(sheet.rows[0].material, "Material 7");
        assert_eq!(sheet.rows[1].qty, None);
    }

    #[test]
    fn test_foreign_row_warehouse_is_preserved() {
        let mut foreign = row(9, Some(1.0));
        foreign.warehouse_id = 4;
        let bytes = write_stock(3, "Main", &[foreign]).unwrap();

        let sheet = read_stock(&bytes).unwrap();
        assert_eq!(sheet.warehouse_id, 3);
        assert_eq!(sheet.rows[0].warehouse_id, 4);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(read_stock(b"not a workbook"), Err(SheetError::Read(_))));
    }
}
