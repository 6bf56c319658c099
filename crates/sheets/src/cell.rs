//! Reading cells by column name.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Worksheet};

use crate::error::{Result, SheetError};

static EMPTY: Data = Data::Empty;

/// First worksheet of a workbook as rows, plus the 0-based index of its first row.
pub(crate) fn open(bytes: &[u8]) -> Result<(usize, Vec<Vec<Data>>)> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SheetError::Empty)?;
    let range = workbook.worksheet_range(&name)?;

    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    if rows.is_empty() {
        return Err(SheetError::Empty);
    }

    Ok((first_row, rows))
}

pub(crate) fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Column positions resolved from a header row.
pub(crate) struct Columns {
    index: HashMap<&'static str, usize>,
}

impl Columns {
    /// Resolve `required` columns (case-insensitive); `optional` ones may be absent.
    pub(crate) fn locate(
        header: &[Data],
        required: &[&'static str],
        optional: &[&'static str],
    ) -> Result<Self> {
        let names: Vec<String> = header
            .iter()
            .map(|c| c.to_string().trim().to_lowercase())
            .collect();

        let mut index = HashMap::new();
        for &wanted in required.iter().chain(optional) {
            match names.iter().position(|n| n == wanted) {
                Some(pos) => {
                    index.insert(wanted, pos);
                }
                None if required.contains(&wanted) => {
                    return Err(SheetError::MissingColumn(wanted));
                }
                None => {}
            }
        }

        Ok(Self { index })
    }
}

/// One data row with its 1-based line number.
pub(crate) struct RowReader<'a> {
    pub(crate) line: usize,
    row: &'a [Data],
    columns: &'a Columns,
}

impl<'a> RowReader<'a> {
    pub(crate) fn new(line: usize, row: &'a [Data], columns: &'a Columns) -> Self {
        Self { line, row, columns }
    }

    fn cell(&self, column: &'static str) -> &Data {
        self.columns
            .index
            .get(column)
            .and_then(|&i| self.row.get(i))
            .unwrap_or(&EMPTY)
    }

    fn bad(&self, column: &'static str, reason: impl Into<String>) -> SheetError {
        SheetError::BadCell {
            row: self.line,
            column,
            reason: reason.into(),
        }
    }

    pub(crate) fn text(&self, column: &'static str) -> String {
        match self.cell(column) {
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        }
    }

    /// A number, or `None` for an empty cell.
    pub(crate) fn opt_f64(&self, column: &'static str) -> Result<Option<f64>> {
        let cell = self.cell(column);
        if is_blank(cell) {
            return Ok(None);
        }
        let value = match cell {
            Data::Float(f) => *f,
            Data::Int(i) => *i as f64,
            Data::String(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|_| self.bad(column, format!("'{}' is not a number", s.trim())))?,
            other => return Err(self.bad(column, format!("'{other}' is not a number"))),
        };
        if !value.is_finite() {
            return Err(self.bad(column, "not a finite number"));
        }
        Ok(Some(value))
    }

    /// A whole number, or `None` for an empty cell.
    pub(crate) fn opt_i64(&self, column: &'static str) -> Result<Option<i64>> {
        match self.opt_f64(column)? {
            None => Ok(None),
            Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Ok(Some(v as i64)),
            Some(v) => Err(self.bad(column, format!("{v} is not a whole number"))),
        }
    }

    pub(crate) fn req_i64(&self, column: &'static str) -> Result<i64> {
        self.opt_i64(column)?
            .ok_or_else(|| self.bad(column, "value is required"))
    }

    pub(crate) fn opt_i32(&self, column: &'static str) -> Result<Option<i32>> {
        match self.opt_i64(column)? {
            None => Ok(None),
            Some(v) => i32::try_from(v)
                .map(Some)
                .map_err(|_| self.bad(column, format!("{v} is out of range"))),
        }
    }

    pub(crate) fn opt_bool(&self, column: &'static str) -> Result<Option<bool>> {
        let cell = self.cell(column);
        if is_blank(cell) {
            return Ok(None);
        }
        match cell {
            Data::Bool(b) => Ok(Some(*b)),
            Data::Int(1) => Ok(Some(true)),
            Data::Int(0) => Ok(Some(false)),
            Data::Float(f) if *f == 1.0 => Ok(Some(true)),
            Data::Float(f) if *f == 0.0 => Ok(Some(false)),
            Data::String(s) => match s.trim().to_lowercase().as_str() {
                "yes" | "true" | "1" => Ok(Some(true)),
                "no" | "false" | "0" => Ok(Some(false)),
                other => Err(self.bad(column, format!("'{other}' is not yes/no"))),
            },
            other => Err(self.bad(column, format!("'{other}' is not yes/no"))),
        }
    }
}

/// Non-blank rows after `skip`, with 1-based line numbers.
pub(crate) fn data_rows<'a>(
    first_row: usize,
    rows: &'a [Vec<Data>],
    skip: usize,
) -> impl Iterator<Item = (usize, &'a [Data])> + 'a {
    rows.iter()
        .enumerate()
        .skip(skip)
        .filter(|(_, row)| !row.iter().all(is_blank))
        .map(move |(i, row)| (first_row + i + 1, row.as_slice()))
}

/// Read the `warehouse_id` preamble cell of row 0.
pub(crate) fn preamble_warehouse(rows: &[Vec<Data>]) -> Result<i64> {
    let row = rows.first().ok_or(SheetError::MissingWarehouse)?;
    let label = row.first().map(|c| c.to_string().trim().to_lowercase());
    if label.as_deref() != Some("warehouse_id") {
        return Err(SheetError::MissingWarehouse);
    }
    match row.get(1) {
        Some(Data::Int(i)) => Ok(*i),
        Some(Data::Float(f)) if f.fract() == 0.0 => Ok(*f as i64),
        Some(Data::String(s)) => s.trim().parse().map_err(|_| SheetError::MissingWarehouse),
        _ => Err(SheetError::MissingWarehouse),
    }
}

/// Write the warehouse preamble row.
pub(crate) fn write_preamble(
    sheet: &mut Worksheet,
    bold: &Format,
    warehouse_id: i64,
    warehouse_name: &str,
) -> Result<()> {
    sheet.write_string_with_format(0, 0, "warehouse_id", bold)?;
    sheet.write_number(0, 1, warehouse_id as f64)?;
    sheet.write_string_with_format(0, 2, "warehouse", bold)?;
    sheet.write_string(0, 3, warehouse_name)?;
    Ok(())
}

/// Write a bold header row.
pub(crate) fn write_header(
    sheet: &mut Worksheet,
    bold: &Format,
    row: u32,
    names: &[&str],
) -> Result<()> {
    for (col, name) in names.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *name, bold)?;
        sheet.set_column_width(col as u16, 16)?;
    }
    Ok(())
}

/// Write an optional number; `None` leaves the cell empty.
pub(crate) fn write_opt_number(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
) -> Result<()> {
    if let Some(value) = value {
        sheet.write_number(row, col, value)?;
    }
    Ok(())
}
