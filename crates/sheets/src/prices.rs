//! Material price layout: the stock layout plus a `price` column.

use rust_xlsxwriter::{Format, Workbook};

use crate::cell::{
    data_rows, open, preamble_warehouse, write_header, write_opt_number, write_preamble, Columns,
    RowReader,
};
use crate::error::{Result, SheetError};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub warehouse_id: i64,
    pub material_id: i64,
    pub material: String,
    pub unit: String,
    /// Balance, informational.
    pub qty: Option<f64>,
    /// `None` leaves the current price unchanged on import.
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSheet {
    pub warehouse_id: i64,
    pub rows: Vec<PriceRow>,
}

const HEADER: [&str; 6] = ["warehouse_id", "material_id", "material", "unit", "qty", "price"];

pub fn write_prices(warehouse_id: i64, warehouse_name: &str, rows: &[PriceRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Prices")?;

    write_preamble(sheet, &bold, warehouse_id, warehouse_name)?;
    write_header(sheet, &bold, 1, &HEADER)?;

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 2;
        sheet.write_number(r, 0, row.warehouse_id as f64)?;
        sheet.write_number(r, 1, row.material_id as f64)?;
        sheet.write_string(r, 2, &row.material)?;
        sheet.write_string(r, 3, &row.unit)?;
        write_opt_number(sheet, r, 4, row.qty)?;
        write_opt_number(sheet, r, 5, row.price)?;
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn read_prices(bytes: &[u8]) -> Result<PriceSheet> {
    let (first_row, rows) = open(bytes)?;
    let warehouse_id = preamble_warehouse(&rows)?;
    let header = rows.get(1).ok_or(SheetError::MissingColumn("material_id"))?;
    let columns = Columns::locate(header, &["material_id", "price"], &["warehouse_id", "material", "unit", "qty"])?;

    let mut parsed = Vec::new();
    for (line, row) in data_rows(first_row, &rows, 2) {
        let reader = RowReader::new(line, row, &columns);
        parsed.push(PriceRow {
            warehouse_id: reader.opt_i64("warehouse_id")?.unwrap_or(warehouse_id),
            material_id: reader.req_i64("material_id")?,
            material: reader.text("material"),
            unit: reader.text("unit"),
            qty: reader.opt_f64("qty")?,
            price: reader.opt_f64("price")?,
        });
    }

    Ok(PriceSheet {
        warehouse_id,
        rows: parsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_price_reads_as_none() {
        let rows = vec![
            PriceRow {
                warehouse_id: 1,
                material_id: 7,
                material: "Wax".into(),
                unit: "g".into(),
                qty: Some(10.0),
                price: Some(3.5),
            },
            PriceRow {
                warehouse_id: 1,
                material_id: 8,
                material: "Gloves".into(),
                unit: "pcs".into(),
                qty: Some(0.0),
                price: None,
            },
        ];
        let sheet = read_prices(&write_prices(1, "Main", &rows).unwrap()).unwrap();
        assert_eq!(sheet.rows[0].price, Some(3.5));
        assert_eq!(sheet.rows[1].price, None);
    }
}
