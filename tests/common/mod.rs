#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use salesintel::domain::error::SalesIntelError;
use salesintel::domain::loader::Clock;
use salesintel::domain::period::Period;
use salesintel::domain::record::{SalesRecord, TerritoryRecord};
use salesintel::ports::source_port::{SourcePort, Table};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockSourcePort {
    pub tables: HashMap<String, Table>,
    pub errors: HashMap<String, String>,
    pub fetches: RefCell<Vec<String>>,
}

impl MockSourcePort {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
            fetches: RefCell::new(Vec::new()),
        }
    }

    pub fn with_table(mut self, key: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        self.tables.insert(key.to_string(), table(headers, rows));
        self
    }

    pub fn with_error(mut self, key: &str, reason: &str) -> Self {
        self.errors.insert(key.to_string(), reason.to_string());
        self
    }

    pub fn fetch_count(&self, key: &str) -> usize {
        self.fetches.borrow().iter().filter(|k| *k == key).count()
    }
}

impl SourcePort for MockSourcePort {
    fn fetch(&self, source_key: &str) -> Result<Table, SalesIntelError> {
        self.fetches.borrow_mut().push(source_key.to_string());
        if let Some(reason) = self.errors.get(source_key) {
            return Err(SalesIntelError::source_unavailable(source_key, reason.clone()));
        }
        self.tables
            .get(source_key)
            .cloned()
            .ok_or_else(|| SalesIntelError::source_unavailable(source_key, "not configured"))
    }

    fn contains(&self, source_key: &str) -> bool {
        self.tables.contains_key(source_key) || self.errors.contains_key(source_key)
    }
}

pub fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn period(year: i32, month: u32) -> Period {
    Period::new(year, month).unwrap()
}

pub fn sale(period: Period, aum: Decimal) -> SalesRecord {
    SalesRecord::new(period, aum)
}

pub fn sale_in(period: Period, state: &str, aum: Decimal) -> SalesRecord {
    let mut r = SalesRecord::new(period, aum);
    r.state = Some(state.to_string());
    r
}

pub fn state_territory(state: &str, wholesaler: &str) -> TerritoryRecord {
    TerritoryRecord {
        state: Some(state.to_string()),
        wholesaler: Some(wholesaler.to_string()),
        ..TerritoryRecord::default()
    }
}

pub const ETF_HEADERS: [&str; 9] = [
    "Date",
    "Account",
    "City",
    "State",
    "Zip",
    "Ticker",
    "AUM",
    "NNA",
    "SP Outsider",
];

/// Two months of ETF extract: three zips in January, four in February.
pub fn etf_rows() -> Vec<[&'static str; 9]> {
    vec![
        ["2024-01-31", "A1", "Boston", "MA", "02134", "BUFR", "$100.00", "10", "Jane"],
        ["2024-01-31", "A2", "Austin", "TX", "73301", "KNG", "$50.00", "", ""],
        ["2024-01-31", "A3", "Newark", "NJ", "07101", "BUFR", "$25.00", "-5", ""],
        ["2024-02-29", "A1", "Boston", "MA", "02134-0001", "BUFR", "$120.00", "20", "Jane"],
        ["2024-02-29", "A2", "Austin", "TX", "73301", "KNG", "$40.00", "-10", ""],
        ["2024-02-29", "A3", "Newark", "NJ", "07101", "BUFR", "$30.00", "5", ""],
        ["2024-02-29", "A4", "Camden", "NJ", "08101", "SEPI", "(5.00)", "", "Jim"],
    ]
}

pub fn etf_source() -> MockSourcePort {
    let rows = etf_rows();
    let row_refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
    MockSourcePort::new()
        .with_table("etf", &ETF_HEADERS, &row_refs)
        .with_table(
            "zip_territory",
            &["Zip", "State", "Wholesaler", "ETF Outsider"],
            &[&["02134", "MA", "", "Eve"], &["73301", "TX", "Tex", ""]],
        )
        .with_table(
            "state_territory",
            &["State", "Wholesaler"],
            &[&["MA", "Smith"], &["NJ", "Jersey"]],
        )
}
