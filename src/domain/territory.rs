//! Wholesaler attribution by geographic key.
//!
//! Every join here is a left join: the output has exactly one row per input
//! sales row, in input order. Rows without a territory match keep a `None`
//! wholesaler and surface as the Unknown bucket downstream.

use crate::domain::record::{SalesRecord, TerritoryRecord, state_key, zip5};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKey {
    State,
    Zip,
    /// Zip first, falling back to state when the zip is unknown.
    ZipThenState,
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinKey::State => "state",
            JoinKey::Zip => "zip",
            JoinKey::ZipThenState => "zip-then-state",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown join key {0:?} (expected state, zip or zip-then-state)")]
pub struct JoinKeyParseError(pub String);

impl FromStr for JoinKey {
    type Err = JoinKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "state" => Ok(JoinKey::State),
            "zip" => Ok(JoinKey::Zip),
            "zip-then-state" => Ok(JoinKey::ZipThenState),
            _ => Err(JoinKeyParseError(s.to_string())),
        }
    }
}

/// Lookup tables over a territory file. The first row for a key wins.
///
/// State lookups prefer state-level rows (no zip); zip-level rows only
/// answer for states no state-level row covers.
struct TerritoryIndex<'a> {
    by_state: HashMap<String, &'a TerritoryRecord>,
    by_zip: HashMap<String, &'a TerritoryRecord>,
}

impl<'a> TerritoryIndex<'a> {
    fn build(territory: &'a [TerritoryRecord]) -> Self {
        let mut by_state = HashMap::new();
        let mut by_zip = HashMap::new();
        for row in territory {
            match row.zip.as_deref().and_then(zip5) {
                Some(zip) => insert_first(&mut by_zip, zip, row, "zip"),
                None => {
                    if let Some(state) = row.state.as_deref().and_then(state_key) {
                        insert_first(&mut by_state, state, row, "state");
                    }
                }
            }
        }
        for row in territory.iter().filter(|r| r.zip.is_some()) {
            if let Some(state) = row.state.as_deref().and_then(state_key) {
                by_state.entry(state).or_insert(row);
            }
        }
        Self { by_state, by_zip }
    }

    fn state(&self, record: &SalesRecord) -> Option<&'a TerritoryRecord> {
        record
            .state
            .as_deref()
            .and_then(state_key)
            .and_then(|s| self.by_state.get(&s).copied())
    }

    fn zip(&self, record: &SalesRecord) -> Option<&'a TerritoryRecord> {
        record.zip5().and_then(|z| self.by_zip.get(&z).copied())
    }

    fn lookup(&self, record: &SalesRecord, key: JoinKey) -> Option<&'a TerritoryRecord> {
        match key {
            JoinKey::State => self.state(record),
            JoinKey::Zip => self.zip(record),
            JoinKey::ZipThenState => self.zip(record).or_else(|| self.state(record)),
        }
    }
}

fn insert_first<'a>(
    index: &mut HashMap<String, &'a TerritoryRecord>,
    key: String,
    row: &'a TerritoryRecord,
    kind: &str,
) {
    match index.get(&key) {
        Some(existing) if existing.wholesaler != row.wholesaler => {
            log::warn!(
                "territory {kind} {key} maps to both {:?} and {:?}; keeping the first",
                existing.wholesaler,
                row.wholesaler
            );
        }
        Some(_) => {}
        None => {
            index.insert(key, row);
        }
    }
}

/// Left-joins sales rows to the territory map, attaching the wholesaler.
///
/// Outsider names already present on a sales row are kept; missing ones are
/// filled from the matched territory row.
pub fn attach_wholesaler(
    sales: Vec<SalesRecord>,
    territory: &[TerritoryRecord],
    key: JoinKey,
) -> Vec<SalesRecord> {
    let index = TerritoryIndex::build(territory);
    let total = sales.len();
    let mut matched = 0usize;

    let joined: Vec<SalesRecord> = sales
        .into_iter()
        .map(|mut record| {
            match index.lookup(&record, key) {
                Some(row) => {
                    matched += 1;
                    record.wholesaler.clone_from(&row.wholesaler);
                    record.outsiders.fill_missing_from(&row.outsiders);
                }
                None => record.wholesaler = None,
            }
            record
        })
        .collect();

    log::debug!("{key} join matched {matched} of {total} sales rows");
    joined
}

/// Reconciles a zip-level territory file with a state-level one.
///
/// Left join on state: each zip row keeps its own wholesaler when it has one,
/// otherwise takes the state map's. Zip rows without a state match are kept.
pub fn combine_territories(
    zip_map: &[TerritoryRecord],
    state_map: &[TerritoryRecord],
) -> Vec<TerritoryRecord> {
    let index = TerritoryIndex::build(state_map);
    zip_map
        .iter()
        .map(|row| {
            let mut combined = row.clone();
            let hit = row
                .state
                .as_deref()
                .and_then(state_key)
                .and_then(|s| index.by_state.get(&s).copied());
            if let Some(state_row) = hit {
                if combined.wholesaler.is_none() {
                    combined.wholesaler.clone_from(&state_row.wholesaler);
                }
                combined.outsiders.fill_missing_from(&state_row.outsiders);
            }
            combined
        })
        .collect()
}
