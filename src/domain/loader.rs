//! Source loading: fetch, convert to typed records, memoize for a TTL.

use crate::domain::currency::parse_dollar_amount;
use crate::domain::error::SalesIntelError;
use crate::domain::period::{Period, parse_asset_date};
use crate::domain::record::{SalesRecord, TerritoryRecord};
use crate::domain::schema::{SalesField, SalesSchema, TerritoryField, TerritorySchema};
use crate::ports::source_port::{SourcePort, Table};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const DEFAULT_TTL_DAYS: i64 = 21;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry<V> {
    value: Arc<V>,
    fetched_at: DateTime<Utc>,
}

/// Cache key to value, each entry valid for `ttl` after it was fetched.
///
/// Entries are replaced whole on refresh and never mutated in place.
pub struct TtlCache<V> {
    ttl: TimeDelta,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// The cached value if it is still fresh at `now`.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| now - e.fetched_at < self.ttl)
            .map(|e| Arc::clone(&e.value))
    }

    pub fn insert(&self, key: &str, value: V, now: DateTime<Utc>) -> Arc<V> {
        let value = Arc::new(value);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: Arc::clone(&value),
                fetched_at: now,
            },
        );
        value
    }

    /// Returns the fresh entry, or runs `load` and stores its result.
    /// A failed load leaves any stale entry untouched.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &str,
        now: DateTime<Utc>,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(hit) = self.get(key, now) {
            log::debug!("cache hit for {key}");
            return Ok(hit);
        }
        let value = load()?;
        Ok(self.insert(key, value, now))
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct SourceLoader<S: SourcePort> {
    source: S,
    clock: Arc<dyn Clock>,
    sales: TtlCache<Vec<SalesRecord>>,
    territory: TtlCache<Vec<TerritoryRecord>>,
}

impl<S: SourcePort> SourceLoader<S> {
    pub fn new(source: S, ttl: TimeDelta) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(source: S, ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            sales: TtlCache::new(ttl),
            territory: TtlCache::new(ttl),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// One source read under two schemas yields two different record sets.
    fn cache_key(source_key: &str, schema_name: &str) -> String {
        format!("{source_key}#{schema_name}")
    }

    pub fn load_sales(
        &self,
        source_key: &str,
        schema: &SalesSchema,
    ) -> Result<Arc<Vec<SalesRecord>>, SalesIntelError> {
        let key = Self::cache_key(source_key, schema.name);
        self.sales
            .get_or_try_insert_with(&key, self.clock.now(), || {
                let table = self.source.fetch(source_key)?;
                let records = sales_from_table(source_key, &table, schema)?;
                log::info!("loaded {} {schema} rows from {source_key}", records.len());
                Ok(records)
            })
    }

    pub fn load_territory(
        &self,
        source_key: &str,
        schema: &TerritorySchema,
    ) -> Result<Arc<Vec<TerritoryRecord>>, SalesIntelError> {
        let key = Self::cache_key(source_key, schema.name);
        self.territory
            .get_or_try_insert_with(&key, self.clock.now(), || {
                let table = self.source.fetch(source_key)?;
                let records = territory_from_table(source_key, &table, schema)?;
                log::info!("loaded {} {schema} rows from {source_key}", records.len());
                Ok(records)
            })
    }
}

pub(crate) fn require_columns(
    source_key: &str,
    table: &Table,
    required: &[&str],
) -> Result<(), SalesIntelError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|h| table.column(h).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SalesIntelError::source_unavailable(
            source_key,
            format!("missing required column(s): {}", missing.join(", ")),
        ))
    }
}

pub(crate) fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

pub(crate) fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Converts a raw extract into sales records.
///
/// Line numbers in errors count the header as line 1.
pub fn sales_from_table(
    source_key: &str,
    table: &Table,
    schema: &SalesSchema,
) -> Result<Vec<SalesRecord>, SalesIntelError> {
    require_columns(source_key, table, &schema.required_headers())?;
    let column = |name: &str| {
        table.column(name).ok_or_else(|| {
            SalesIntelError::source_unavailable(source_key, format!("missing column {name}"))
        })
    };
    let aum_idx = column(schema.aum)?;
    let date_idx = column(schema.date)?;
    let fields: Vec<(SalesField, usize)> = schema
        .fields
        .iter()
        .filter_map(|(field, header)| table.column(header).map(|idx| (*field, idx)))
        .collect();

    let mut records = Vec::with_capacity(table.len());
    for (i, row) in table.rows.iter().enumerate() {
        let line = i + 2;
        let bad = |reason: String| {
            SalesIntelError::source_unavailable(source_key, format!("line {line}: {reason}"))
        };

        let date_raw = cell(row, date_idx);
        let date = parse_asset_date(date_raw)
            .ok_or_else(|| bad(format!("invalid {} {:?}", schema.date, date_raw)))?;
        let aum = parse_dollar_amount(cell(row, aum_idx))
            .map_err(|e| bad(e.to_string()))?
            .ok_or_else(|| bad(format!("blank {}", schema.aum)))?;

        let mut record = SalesRecord::new(Period::from_date(date), aum);
        for (field, idx) in &fields {
            let raw = cell(row, *idx);
            let amount = || -> Result<Option<Decimal>, SalesIntelError> {
                parse_dollar_amount(raw).map_err(|e| bad(e.to_string()))
            };
            match field {
                SalesField::Account => record.account = text(raw),
                SalesField::SubAccount => record.sub_account = text(raw),
                SalesField::IntermediaryFirm => record.intermediary_firm = text(raw),
                SalesField::InitiatingFirm => record.initiating_firm = text(raw),
                SalesField::AddressLine1 => record.address_line1 = text(raw),
                SalesField::AddressLine2 => record.address_line2 = text(raw),
                SalesField::City => record.city = text(raw),
                SalesField::State => record.state = text(raw),
                SalesField::PostalCode => record.postal_code = text(raw),
                SalesField::Category => record.category = text(raw),
                SalesField::Ticker => record.ticker = text(raw),
                SalesField::Channel => record.channel = text(raw),
                SalesField::IsOutsider => record.outsiders.is = text(raw),
                SalesField::EtfOutsider => record.outsiders.etf = text(raw),
                SalesField::SpOutsider => record.outsiders.sp = text(raw),
                SalesField::ComOutsider => record.outsiders.com = text(raw),
                SalesField::Nna => record.nna = amount()?,
                SalesField::IndustryAum => record.industry_aum = amount()?,
                SalesField::IndustryNna => record.industry_nna = amount()?,
            }
        }
        records.push(record);
    }
    Ok(records)
}

pub fn territory_from_table(
    source_key: &str,
    table: &Table,
    schema: &TerritorySchema,
) -> Result<Vec<TerritoryRecord>, SalesIntelError> {
    require_columns(source_key, table, &schema.required)?;
    let fields: Vec<(TerritoryField, usize)> = schema
        .fields
        .iter()
        .filter_map(|(field, header)| table.column(header).map(|idx| (*field, idx)))
        .collect();

    let records = table
        .rows
        .iter()
        .map(|row| {
            let mut record = TerritoryRecord::default();
            for (field, idx) in &fields {
                let value = text(cell(row, *idx));
                match field {
                    TerritoryField::State => record.state = value,
                    TerritoryField::Zip => record.zip = value,
                    TerritoryField::Wholesaler => record.wholesaler = value,
                    TerritoryField::IsOutsider => record.outsiders.is = value,
                    TerritoryField::EtfOutsider => record.outsiders.etf = value,
                    TerritoryField::SpOutsider => record.outsiders.sp = value,
                    TerritoryField::ComOutsider => record.outsiders.com = value,
                }
            }
            record
        })
        .collect();
    Ok(records)
}
