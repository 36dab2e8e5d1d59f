//! Column layouts of the known extracts.
//!
//! A schema maps header names to record fields. Required headers must be
//! present in the fetched table; every other mapped header is optional.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesField {
    Account,
    SubAccount,
    IntermediaryFirm,
    InitiatingFirm,
    AddressLine1,
    AddressLine2,
    City,
    State,
    PostalCode,
    Category,
    Ticker,
    Channel,
    IsOutsider,
    EtfOutsider,
    SpOutsider,
    ComOutsider,
    Nna,
    IndustryAum,
    IndustryNna,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSchema {
    pub name: &'static str,
    pub aum: &'static str,
    pub date: &'static str,
    pub fields: Vec<(SalesField, &'static str)>,
    /// Headers beyond AUM and date that must exist.
    pub required: Vec<&'static str>,
}

impl SalesSchema {
    pub const NAMES: [&'static str; 3] = ["mutual_fund", "etf", "uit"];

    /// Broadridge mutual fund extract.
    pub fn mutual_fund() -> Self {
        use SalesField::*;
        Self {
            name: "mutual_fund",
            aum: "AUM",
            date: "Month/Year (Asset Date)",
            fields: vec![
                (IntermediaryFirm, "Intermediary Firm Name"),
                (InitiatingFirm, "Initiating Firm Name"),
                (AddressLine1, "Address Line 1"),
                (AddressLine2, "Address Line 2"),
                (City, "City"),
                (State, "State/Region"),
                (PostalCode, "Postal Code"),
                (Category, "Client Defined Category Name"),
                (Ticker, "Ticker"),
                (Channel, "Channel"),
                (IsOutsider, "Institutional Outsider"),
                (EtfOutsider, "ETF Outsider"),
                (SpOutsider, "SP Outsider"),
                (ComOutsider, "COM Outsider"),
                (Nna, "NNA"),
                (IndustryAum, "Industry AUM"),
                (IndustryNna, "Industry NNA"),
            ],
            required: vec!["State/Region"],
        }
    }

    pub fn etf() -> Self {
        use SalesField::*;
        Self {
            name: "etf",
            aum: "AUM",
            date: "Date",
            fields: vec![
                (Account, "Account"),
                (SubAccount, "Sub Acct Name"),
                (AddressLine1, "Office Address"),
                (City, "City"),
                (State, "State"),
                (PostalCode, "Zip"),
                (Ticker, "Ticker"),
                (Channel, "Channel"),
                (EtfOutsider, "ETF Outsider"),
                (SpOutsider, "SP Outsider"),
                (ComOutsider, "COM Outsider"),
                (Nna, "NNA"),
            ],
            required: vec!["State", "Zip"],
        }
    }

    pub fn uit() -> Self {
        use SalesField::*;
        Self {
            name: "uit",
            aum: "AUM",
            date: "Date",
            fields: vec![
                (Account, "Account"),
                (SubAccount, "Sub Acct Name"),
                (AddressLine1, "Office Address"),
                (City, "Office City"),
                (State, "Office State"),
                (PostalCode, "Zip"),
                (Ticker, "Ticker"),
                (Channel, "Channel"),
                (EtfOutsider, "ETF Outsider"),
                (SpOutsider, "SP Outsider"),
                (ComOutsider, "COM Outsider"),
                (Nna, "NNA"),
            ],
            required: vec!["Office State", "Zip"],
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "mutual_fund" | "mf" => Some(Self::mutual_fund()),
            "etf" => Some(Self::etf()),
            "uit" => Some(Self::uit()),
            _ => None,
        }
    }

    /// AUM, date and the extra required headers, in that order.
    pub fn required_headers(&self) -> Vec<&'static str> {
        let mut headers = vec![self.aum, self.date];
        headers.extend(self.required.iter().copied());
        headers
    }
}

impl fmt::Display for SalesSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerritoryField {
    State,
    Zip,
    Wholesaler,
    IsOutsider,
    EtfOutsider,
    SpOutsider,
    ComOutsider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritorySchema {
    pub name: &'static str,
    pub fields: Vec<(TerritoryField, &'static str)>,
    pub required: Vec<&'static str>,
}

impl TerritorySchema {
    pub const NAMES: [&'static str; 2] = ["state_territory", "zip_territory"];

    /// State to internal wholesaler.
    pub fn state_territory() -> Self {
        Self {
            name: "state_territory",
            fields: vec![
                (TerritoryField::State, "State"),
                (TerritoryField::Wholesaler, "Wholesaler"),
            ],
            required: vec!["State", "Wholesaler"],
        }
    }

    /// Zip-level map carrying the external wholesaler teams.
    pub fn zip_territory() -> Self {
        use TerritoryField::*;
        Self {
            name: "zip_territory",
            fields: vec![
                (Zip, "Zip"),
                (State, "State"),
                (Wholesaler, "Wholesaler"),
                (IsOutsider, "Institutional Outsider"),
                (EtfOutsider, "ETF Outsider"),
                (SpOutsider, "SP Outsider"),
                (ComOutsider, "COM Outsider"),
            ],
            required: vec!["Zip", "State"],
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "state_territory" | "state" => Some(Self::state_territory()),
            "zip_territory" | "zip" => Some(Self::zip_territory()),
            _ => None,
        }
    }
}

impl fmt::Display for TerritorySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
