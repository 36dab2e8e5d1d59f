//! Assembles the joined, normalized record set for one product extract.

use crate::domain::category::{CategoryMapping, normalize};
use crate::domain::error::SalesIntelError;
use crate::domain::loader::SourceLoader;
use crate::domain::record::{SalesRecord, TerritoryRecord};
use crate::domain::schema::{SalesSchema, TerritorySchema};
use crate::domain::territory::{JoinKey, attach_wholesaler, combine_territories};
use crate::ports::source_port::SourcePort;
use std::sync::Arc;

pub const STATE_TERRITORY_KEY: &str = "state_territory";
pub const ZIP_TERRITORY_KEY: &str = "zip_territory";

/// The territory map for the configured sources, if any.
///
/// With both a zip and a state map, the zip rows are completed from the state
/// map and the state rows are kept alongside them for state fallback. With
/// one, that one is used as is.
pub fn load_territory<S: SourcePort>(
    loader: &SourceLoader<S>,
) -> Result<Option<Vec<TerritoryRecord>>, SalesIntelError> {
    let source = loader.source();
    let zip = source
        .contains(ZIP_TERRITORY_KEY)
        .then(|| loader.load_territory(ZIP_TERRITORY_KEY, &TerritorySchema::zip_territory()))
        .transpose()?;
    let state = source
        .contains(STATE_TERRITORY_KEY)
        .then(|| loader.load_territory(STATE_TERRITORY_KEY, &TerritorySchema::state_territory()))
        .transpose()?;

    Ok(match (zip, state) {
        (Some(zip), Some(state)) => {
            let mut combined = combine_territories(&zip, &state);
            combined.extend(state.iter().cloned());
            Some(combined)
        }
        (Some(only), None) | (None, Some(only)) => Some(Arc::unwrap_or_clone(only)),
        (None, None) => None,
    })
}

/// Join key used when none is requested: zip with state fallback when a zip
/// map is configured, state otherwise.
pub fn default_join_key<S: SourcePort>(source: &S) -> JoinKey {
    if source.contains(ZIP_TERRITORY_KEY) {
        JoinKey::ZipThenState
    } else {
        JoinKey::State
    }
}

/// Loads the product extract under its schema name, attaches wholesalers and
/// substitutes category display names.
pub fn load_dataset<S: SourcePort>(
    loader: &SourceLoader<S>,
    schema: &SalesSchema,
    join: Option<JoinKey>,
    categories: &CategoryMapping,
) -> Result<Vec<SalesRecord>, SalesIntelError> {
    let sales = loader.load_sales(schema.name, schema)?;
    let sales = Arc::unwrap_or_clone(sales);

    let joined = match load_territory(loader)? {
        Some(territory) => {
            let key = join.unwrap_or_else(|| default_join_key(loader.source()));
            attach_wholesaler(sales, &territory, key)
        }
        None => {
            log::warn!("no territory source configured; wholesalers left unassigned");
            sales
        }
    };

    Ok(normalize(joined, categories))
}
