//! XLSX workbook: one worksheet, a bold header row, one row per record.

use super::Table;
use crate::{Error, Result};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

/// Columns written as numbers rather than text.
const NUMERIC_COLUMNS: &[&str] = &["Valor"];

/// Excel caps worksheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

fn export_error(e: XlsxError) -> Error {
    Error::Export(format!("xlsx: {}", e))
}

/// Encode a table as an XLSX workbook.
pub fn render(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    let name: String = table.title.chars().take(MAX_SHEET_NAME).collect();
    if !name.is_empty() {
        worksheet.set_name(&name).map_err(export_error)?;
    }

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(export_error)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let numeric = table
                .headers
                .get(col)
                .is_some_and(|h| NUMERIC_COLUMNS.contains(&h.as_str()));
            match value.parse::<f64>() {
                Ok(number) if numeric => {
                    worksheet
                        .write_number(r, col as u16, number)
                        .map_err(export_error)?;
                }
                _ => {
                    worksheet
                        .write_string(r, col as u16, value)
                        .map_err(export_error)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0).map_err(export_error)?;
    worksheet.autofit();

    workbook.save_to_buffer().map_err(export_error)
}
