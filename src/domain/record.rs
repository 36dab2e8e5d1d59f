//! Sales and territory records, plus the fields they can be grouped and summed by.

use crate::domain::period::Period;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Label shown for records whose group key is null.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// External wholesaler assignments carried by sales extracts and zip territories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outsiders {
    pub is: Option<String>,
    pub etf: Option<String>,
    pub sp: Option<String>,
    pub com: Option<String>,
}

impl Outsiders {
    /// Fills only the fields that are still `None`.
    pub fn fill_missing_from(&mut self, other: &Outsiders) {
        fn fill(slot: &mut Option<String>, from: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(from);
            }
        }
        fill(&mut self.is, &other.is);
        fill(&mut self.etf, &other.etf);
        fill(&mut self.sp, &other.sp);
        fill(&mut self.com, &other.com);
    }
}

/// One row per account/sub-account per reporting period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRecord {
    pub account: Option<String>,
    pub sub_account: Option<String>,
    pub intermediary_firm: Option<String>,
    pub initiating_firm: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub category: Option<String>,
    pub ticker: Option<String>,
    pub channel: Option<String>,
    pub outsiders: Outsiders,
    pub wholesaler: Option<String>,
    pub aum: Decimal,
    pub nna: Option<Decimal>,
    pub industry_aum: Option<Decimal>,
    pub industry_nna: Option<Decimal>,
    pub period: Period,
}

impl SalesRecord {
    pub fn new(period: Period, aum: Decimal) -> Self {
        Self {
            account: None,
            sub_account: None,
            intermediary_firm: None,
            initiating_firm: None,
            address_line1: None,
            address_line2: None,
            city: None,
            state: None,
            postal_code: None,
            category: None,
            ticker: None,
            channel: None,
            outsiders: Outsiders::default(),
            wholesaler: None,
            aum,
            nna: None,
            industry_aum: None,
            industry_nna: None,
            period,
        }
    }

    pub fn measure(&self, measure: Measure) -> Option<Decimal> {
        match measure {
            Measure::Aum => Some(self.aum),
            Measure::Nna => self.nna,
            Measure::IndustryAum => self.industry_aum,
            Measure::IndustryNna => self.industry_nna,
        }
    }

    pub fn key(&self, key: GroupKey) -> Option<&str> {
        let value = match key {
            GroupKey::Wholesaler => &self.wholesaler,
            GroupKey::Category => &self.category,
            GroupKey::Ticker => &self.ticker,
            GroupKey::Channel => &self.channel,
            GroupKey::Firm => &self.initiating_firm,
            GroupKey::Intermediary => &self.intermediary_firm,
            GroupKey::State => &self.state,
            GroupKey::IsOutsider => &self.outsiders.is,
            GroupKey::EtfOutsider => &self.outsiders.etf,
            GroupKey::SpOutsider => &self.outsiders.sp,
            GroupKey::ComOutsider => &self.outsiders.com,
        };
        value.as_deref()
    }

    /// First five characters of the postal code, the granularity territory files use.
    pub fn zip5(&self) -> Option<String> {
        self.postal_code.as_deref().and_then(zip5)
    }
}

/// Maps a state (and optionally a zip) to a named wholesaler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerritoryRecord {
    pub state: Option<String>,
    pub zip: Option<String>,
    pub wholesaler: Option<String>,
    pub outsiders: Outsiders,
}

/// First five characters of a zip. Short all-digit zips, as spreadsheets
/// store them once the leading zeros are lost, are zero-padded.
pub fn zip5(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() < 5 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Some(format!("{trimmed:0>5}"));
    }
    Some(trimmed.chars().take(5).collect())
}

/// Normalised form used for state comparisons.
pub fn state_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownFieldError {
    pub kind: &'static str,
    pub value: String,
}

/// Columns a record set can be grouped or filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Wholesaler,
    Category,
    Ticker,
    Channel,
    Firm,
    Intermediary,
    State,
    IsOutsider,
    EtfOutsider,
    SpOutsider,
    ComOutsider,
}

impl GroupKey {
    pub const ALL: [GroupKey; 11] = [
        GroupKey::Wholesaler,
        GroupKey::Category,
        GroupKey::Ticker,
        GroupKey::Channel,
        GroupKey::Firm,
        GroupKey::Intermediary,
        GroupKey::State,
        GroupKey::IsOutsider,
        GroupKey::EtfOutsider,
        GroupKey::SpOutsider,
        GroupKey::ComOutsider,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GroupKey::Wholesaler => "wholesaler",
            GroupKey::Category => "category",
            GroupKey::Ticker => "ticker",
            GroupKey::Channel => "channel",
            GroupKey::Firm => "firm",
            GroupKey::Intermediary => "intermediary",
            GroupKey::State => "state",
            GroupKey::IsOutsider => "is-outsider",
            GroupKey::EtfOutsider => "etf-outsider",
            GroupKey::SpOutsider => "sp-outsider",
            GroupKey::ComOutsider => "com-outsider",
        }
    }

    /// Column header used in rendered and exported tables.
    pub fn label(self) -> &'static str {
        match self {
            GroupKey::Wholesaler => "Wholesaler",
            GroupKey::Category => "Category",
            GroupKey::Ticker => "Ticker",
            GroupKey::Channel => "Channel",
            GroupKey::Firm => "Initiating Firm Name",
            GroupKey::Intermediary => "Intermediary Firm Name",
            GroupKey::State => "State",
            GroupKey::IsOutsider => "IS Outsider",
            GroupKey::EtfOutsider => "ETF Outsider",
            GroupKey::SpOutsider => "SP Outsider",
            GroupKey::ComOutsider => "COM Outsider",
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GroupKey {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        GroupKey::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| UnknownFieldError {
                kind: "group key",
                value: s.to_string(),
            })
    }
}

/// Currency columns that can be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    Aum,
    Nna,
    IndustryAum,
    IndustryNna,
}

impl Measure {
    pub fn name(self) -> &'static str {
        match self {
            Measure::Aum => "aum",
            Measure::Nna => "nna",
            Measure::IndustryAum => "industry-aum",
            Measure::IndustryNna => "industry-nna",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Measure::Aum => "AUM",
            Measure::Nna => "NNA",
            Measure::IndustryAum => "Industry AUM",
            Measure::IndustryNna => "Industry NNA",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Measure {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "aum" => Ok(Measure::Aum),
            "nna" => Ok(Measure::Nna),
            "industry-aum" => Ok(Measure::IndustryAum),
            "industry-nna" => Ok(Measure::IndustryNna),
            _ => Err(UnknownFieldError {
                kind: "measure",
                value: s.to_string(),
            }),
        }
    }
}
