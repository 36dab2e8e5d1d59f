//! Export sink port trait.

use crate::domain::error::SalesIntelError;
use crate::domain::export::ExportTable;

pub trait ExportPort {
    /// Conventional file extension, without the dot.
    fn extension(&self) -> &'static str;

    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, SalesIntelError>;
}
