//! One-sheet tables ready for a file export.
//!
//! Every cell is already a display string: currency columns go through
//! [`format_dollar_amount`], missing pivot cells are empty.

use crate::domain::aggregate::{PeriodSummary, PivotTable, Ranking};
use crate::domain::currency::{format_dollar_amount, format_optional};
use crate::domain::firm_lookup::FirmLookup;
use crate::domain::record::{Measure, SalesRecord, UNKNOWN_LABEL};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Excel caps sheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Format implied by a file extension, if it is one we write.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("csv"),
            ExportFormat::Xlsx => f.write_str("xlsx"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn new(sheet_name: &str, headers: Vec<String>) -> Self {
        Self {
            sheet_name: sheet_name_for(sheet_name),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn from_ranking(sheet_name: &str, ranking: &Ranking) -> Self {
        let mut headers: Vec<String> =
            ranking.group_keys.iter().map(|k| k.label().to_string()).collect();
        headers.push(ranking.measure.label().to_string());
        headers.push("Rows".to_string());

        let mut table = Self::new(sheet_name, headers);
        for row in &ranking.rows {
            let mut cells: Vec<String> = row.labels().into_iter().map(str::to_string).collect();
            cells.push(format_dollar_amount(row.value));
            cells.push(row.count.to_string());
            table.push_row(cells);
        }
        table
    }

    pub fn from_pivot(sheet_name: &str, pivot: &PivotTable) -> Self {
        let mut headers: Vec<String> =
            pivot.row_keys.iter().map(|k| k.label().to_string()).collect();
        headers.extend(pivot.column_labels().into_iter().map(str::to_string));
        headers.push("Total".to_string());

        let mut table = Self::new(sheet_name, headers);
        for row in &pivot.rows {
            let mut cells: Vec<String> = row.labels().into_iter().map(str::to_string).collect();
            cells.extend(row.cells.iter().map(|c| format_optional(*c)));
            cells.push(format_dollar_amount(row.total));
            table.push_row(cells);
        }
        table
    }

    pub fn from_summary(sheet_name: &str, summary: &PeriodSummary) -> Self {
        let headers = vec![
            "Metric".to_string(),
            summary.period.to_string(),
            summary.previous_period.to_string(),
            "Change".to_string(),
        ];
        let mut table = Self::new(sheet_name, headers);
        for (measure, metric) in [(Measure::Aum, &summary.aum), (Measure::Nna, &summary.nna)] {
            table.push_row(vec![
                measure.label().to_string(),
                format_dollar_amount(metric.current),
                format_dollar_amount(metric.previous),
                format_dollar_amount(metric.change),
            ]);
        }
        table
    }

    /// Client listing: one line per record.
    pub fn from_records(sheet_name: &str, records: &[SalesRecord]) -> Self {
        let headers = [
            "Period",
            "Account",
            "Initiating Firm Name",
            "City",
            "State",
            "Ticker",
            "Category",
            "Wholesaler",
            "AUM",
            "NNA",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();

        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut table = Self::new(sheet_name, headers);
        for r in records {
            table.push_row(vec![
                r.period.to_string(),
                text(&r.account),
                text(&r.initiating_firm),
                text(&r.city),
                text(&r.state),
                text(&r.ticker),
                text(&r.category),
                r.wholesaler.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
                format_dollar_amount(r.aum),
                format_optional(r.nna),
            ]);
        }
        table
    }

    /// Every requested firm in the order given; firms without data have blank cells.
    pub fn from_firm_lookup(sheet_name: &str, lookup: &FirmLookup) -> Self {
        let mut headers = vec!["Initiating Firm Name".to_string()];
        headers.extend(lookup.category_labels().into_iter().map(str::to_string));
        headers.push("Total".to_string());

        let mut table = Self::new(sheet_name, headers);
        for row in &lookup.ordered {
            let mut cells = vec![row.firm.clone()];
            cells.extend(row.cells.iter().map(|c| format_optional(*c)));
            cells.push(if row.has_data() {
                format_dollar_amount(row.total())
            } else {
                String::new()
            });
            table.push_row(cells);
        }
        table
    }
}

/// Strips characters Excel rejects in sheet names and truncates to its limit.
fn sheet_name_for(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}
