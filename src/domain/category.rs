//! Raw category/ticker codes to cohort display names.

use crate::domain::record::SalesRecord;
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;

pub const CATEGORY_SECTION: &str = "categories";

/// Fixed code -> display-name lookup. Codes are matched on their trimmed form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMapping {
    names: BTreeMap<String, String>,
}

impl CategoryMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: &str, display: &str) -> Self {
        self.insert(code, display);
        self
    }

    pub fn insert(&mut self, code: &str, display: &str) {
        self.names
            .insert(code.trim().to_string(), display.trim().to_string());
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let mut mapping = Self::new();
        for (code, display) in config.get_section(CATEGORY_SECTION) {
            mapping.insert(&code, &display);
        }
        mapping
    }

    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.names.get(code.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Substitutes mapped category codes; unmapped codes pass through unchanged.
pub fn normalize(mut records: Vec<SalesRecord>, mapping: &CategoryMapping) -> Vec<SalesRecord> {
    for record in &mut records {
        substitute(&mut record.category, mapping);
    }
    records
}

/// Same substitution applied to the ticker column.
pub fn normalize_tickers(
    mut records: Vec<SalesRecord>,
    mapping: &CategoryMapping,
) -> Vec<SalesRecord> {
    for record in &mut records {
        substitute(&mut record.ticker, mapping);
    }
    records
}

fn substitute(slot: &mut Option<String>, mapping: &CategoryMapping) {
    if let Some(display) = slot.as_deref().and_then(|code| mapping.lookup(code)) {
        *slot = Some(display.to_string());
    }
}
