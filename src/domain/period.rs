//! Reporting periods and the selected/previous period window.
//!
//! A period is a calendar year-month. The previous period is always the
//! calendar month before the selection, even when the extract skips months.

use crate::domain::record::SalesRecord;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid period {0:?} (expected YYYY-MM or MM-YYYY)")]
pub struct PeriodParseError(pub String);

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The calendar month immediately before this one.
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Parses `YYYY-MM`, `MM-YYYY`, or a full date (the day is ignored).
    pub fn parse(input: &str) -> Result<Self, PeriodParseError> {
        let s = input.trim();
        let err = || PeriodParseError(input.to_string());

        if let Some(date) = parse_asset_date(s) {
            return Ok(Self::from_date(date));
        }

        let (a, b) = s.split_once(['-', '/']).ok_or_else(err)?;
        let (year, month) = if a.len() == 4 { (a, b) } else { (b, a) };
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Parses a date cell as exported by the sales systems.
///
/// Month-only values (`2024-01`, `01-2024`) resolve to the first of the month.
pub fn parse_asset_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Some(d);
    }
    NaiveDate::parse_from_str(&format!("{s}-01"), "%m-%Y-%d").ok()
}

/// Records of the selected period and of the calendar month before it.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodWindow {
    pub selected: Period,
    pub previous_period: Period,
    pub current: Vec<SalesRecord>,
    pub previous: Vec<SalesRecord>,
}

pub fn select_period(records: &[SalesRecord], period: Period) -> PeriodWindow {
    let previous_period = period.previous();
    let current = records
        .iter()
        .filter(|r| r.period == period)
        .cloned()
        .collect();
    let previous = records
        .iter()
        .filter(|r| r.period == previous_period)
        .cloned()
        .collect();
    PeriodWindow {
        selected: period,
        previous_period,
        current,
        previous,
    }
}

/// Distinct periods present in the records, oldest first.
pub fn available_periods(records: &[SalesRecord]) -> Vec<Period> {
    let unique: BTreeSet<Period> = records.iter().map(|r| r.period).collect();
    unique.into_iter().collect()
}

/// The default selection: the most recent period in the extract.
pub fn latest_period(records: &[SalesRecord]) -> Option<Period> {
    records.iter().map(|r| r.period).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn p(y: i32, m: u32) -> Period {
        Period::new(y, m).unwrap()
    }

    fn record(period: Period, aum: rust_decimal::Decimal) -> SalesRecord {
        SalesRecord::new(period, aum)
    }

    #[test]
    fn previous_crosses_year_boundary() {
        assert_eq!(p(2024, 1).previous(), p(2023, 12));
        assert_eq!(p(2024, 7).previous(), p(2024, 6));
    }

    #[test]
    fn new_rejects_invalid_month() {
        assert!(Period::new(2024, 0).is_none());
        assert!(Period::new(2024, 13).is_none());
    }

    #[test]
    fn parse_accepts_both_orders() {
        assert_eq!(Period::parse("2024-03").unwrap(), p(2024, 3));
        assert_eq!(Period::parse("03-2024").unwrap(), p(2024, 3));
        assert_eq!(Period::parse("2024-03-01").unwrap(), p(2024, 3));
        assert!(Period::parse("March").is_err());
        assert!(Period::parse("2024-13").is_err());
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(p(2024, 2).to_string(), "2024-02");
    }

    #[test]
    fn parse_asset_date_formats() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(parse_asset_date("2024-01-01"), Some(jan));
        assert_eq!(parse_asset_date("01/01/2024"), Some(jan));
        assert_eq!(parse_asset_date("2024-01-01 00:00:00"), Some(jan));
        assert_eq!(parse_asset_date("2024-01"), Some(jan));
        assert_eq!(parse_asset_date("01-2024"), Some(jan));
        assert_eq!(parse_asset_date(""), None);
        assert_eq!(parse_asset_date("not a date"), None);
    }

    #[test]
    fn select_period_uses_calendar_previous() {
        // March is missing: selecting April must give an empty previous set
        let records = vec![
            record(p(2024, 2), dec!(10)),
            record(p(2024, 4), dec!(40)),
        ];
        let window = select_period(&records, p(2024, 4));
        assert_eq!(window.current.len(), 1);
        assert!(window.previous.is_empty());
        assert_eq!(window.previous_period, p(2024, 3));
    }

    #[test]
    fn select_period_empty_selection() {
        let records = vec![record(p(2024, 2), dec!(10))];
        let window = select_period(&records, p(2025, 1));
        assert!(window.current.is_empty());
        assert!(window.previous.is_empty());
    }

    #[test]
    fn available_periods_sorted_unique() {
        let records = vec![
            record(p(2024, 3), dec!(1)),
            record(p(2023, 12), dec!(1)),
            record(p(2024, 3), dec!(1)),
        ];
        assert_eq!(available_periods(&records), vec![p(2023, 12), p(2024, 3)]);
        assert_eq!(latest_period(&records), Some(p(2024, 3)));
        assert_eq!(latest_period(&[]), None);
    }
}
