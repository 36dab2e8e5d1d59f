//! Multi-select column filters.
//!
//! A record passes when, for every field filter, its value is in the allowed
//! set. A null value only passes if the Unknown bucket was selected.

use crate::domain::record::{GroupKey, SalesRecord, UNKNOWN_LABEL};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub key: GroupKey,
    pub allowed: BTreeSet<Option<String>>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FilterParseError {
    #[error("filter {0:?} must look like key=value[,value...]")]
    Malformed(String),

    #[error(transparent)]
    UnknownKey(#[from] crate::domain::record::UnknownFieldError),
}

impl FieldFilter {
    pub fn new<I, S>(key: GroupKey, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = values
            .into_iter()
            .map(|v| parse_value(v.as_ref()))
            .collect();
        Self { key, allowed }
    }

    pub fn matches(&self, record: &SalesRecord) -> bool {
        let value = record.key(self.key).map(str::to_string);
        self.allowed.contains(&value)
    }
}

/// `Unknown` selects records with no value.
fn parse_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == UNKNOWN_LABEL {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl FromStr for FieldFilter {
    type Err = FilterParseError;

    /// Parses `channel=RIA,BD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, values) = s
            .split_once('=')
            .ok_or_else(|| FilterParseError::Malformed(s.to_string()))?;
        let key: GroupKey = key.parse()?;
        let values: Vec<&str> = values.split(',').filter(|v| !v.trim().is_empty()).collect();
        if values.is_empty() {
            return Err(FilterParseError::Malformed(s.to_string()));
        }
        Ok(Self::new(key, values))
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<&str> = self
            .allowed
            .iter()
            .map(|v| v.as_deref().unwrap_or(UNKNOWN_LABEL))
            .collect();
        write!(f, "{}={}", self.key, values.join(","))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub fields: Vec<FieldFilter>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: FieldFilter) -> Self {
        self.fields.push(field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, record: &SalesRecord) -> bool {
        self.fields.iter().all(|f| f.matches(record))
    }

    pub fn apply(&self, records: &[SalesRecord]) -> Vec<SalesRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Distinct values of a field, sorted, with Unknown last. Feeds the multi-select options.
pub fn distinct_values(records: &[SalesRecord], key: GroupKey) -> Vec<Option<String>> {
    let set: BTreeSet<Option<String>> = records
        .iter()
        .map(|r| r.key(key).map(str::to_string))
        .collect();
    let has_unknown = set.contains(&None);
    let mut values: Vec<Option<String>> = set.into_iter().flatten().map(Some).collect();
    if has_unknown {
        values.push(None);
    }
    values
}
