//! Excel export adapter: one worksheet, bold header row.

use crate::domain::error::SalesIntelError;
use crate::domain::export::ExportTable;
use crate::ports::export_port::ExportPort;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

pub struct XlsxExport;

fn export_error(e: XlsxError) -> SalesIntelError {
    SalesIntelError::Export {
        reason: format!("xlsx: {e}"),
    }
}

impl ExportPort for XlsxExport {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, SalesIntelError> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        let sheet = workbook.add_worksheet();
        sheet.set_name(&table.sheet_name).map_err(export_error)?;

        for (col, name) in table.headers.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, name, &header)
                .map_err(export_error)?;
        }
        for (i, row) in table.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                sheet
                    .write_string(r, col as u16, value)
                    .map_err(export_error)?;
            }
        }
        sheet.autofit();

        workbook.save_to_buffer().map_err(export_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_zip_container() {
        let mut table = ExportTable::new("By Wholesaler", vec!["Wholesaler".into(), "AUM".into()]);
        table.push_row(vec!["Smith".into(), "$100.00".into()]);
        let bytes = XlsxExport.export(&table).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_table_still_exports() {
        let table = ExportTable::new("Empty", vec!["Metric".into()]);
        let bytes = XlsxExport.export(&table).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
