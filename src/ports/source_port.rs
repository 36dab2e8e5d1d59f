//! Raw tabular source port.

use crate::domain::error::SalesIntelError;

/// A raw extract: header names plus string cells, exactly as fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of a header, compared on trimmed text.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub trait SourcePort {
    fn fetch(&self, source_key: &str) -> Result<Table, SalesIntelError>;

    /// Whether `source_key` is configured at all.
    fn contains(&self, source_key: &str) -> bool;
}
