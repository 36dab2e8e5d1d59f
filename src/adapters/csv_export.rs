//! CSV export adapter.

use crate::domain::error::SalesIntelError;
use crate::domain::export::ExportTable;
use crate::ports::export_port::ExportPort;

pub struct CsvExport;

impl ExportPort for CsvExport {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, SalesIntelError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        let fail = |e: csv::Error| SalesIntelError::Export {
            reason: format!("CSV write error: {e}"),
        };
        wtr.write_record(&table.headers).map_err(fail)?;
        for row in &table.rows {
            wtr.write_record(row).map_err(fail)?;
        }
        wtr.into_inner().map_err(|e| SalesIntelError::Export {
            reason: format!("CSV flush error: {}", e.error()),
        })
    }
}
