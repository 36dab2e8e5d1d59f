//! 13F holdings summary: a watched ticker list matched against a filer's
//! holdings export, one `Ticker Type $value` line per position.

use crate::domain::currency::{format_whole_dollars, parse_dollar_amount};
use crate::domain::error::SalesIntelError;
use crate::domain::loader::{cell, require_columns, text};
use crate::ports::source_port::Table;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

pub const TICKER_COLUMN: &str = "Ticker";
pub const SYMBOL_COLUMN: &str = "Symbol";
pub const MARKET_VALUE_COLUMN: &str = "Market Value";
pub const TYPE_COLUMN: &str = "Type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedTicker {
    pub ticker: String,
    pub kind: Option<String>,
}

/// One row of a 13F holdings export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiledPosition {
    pub symbol: String,
    pub kind: Option<String>,
    pub market_value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingLine {
    pub ticker: String,
    pub kind: Option<String>,
    /// Whole dollars.
    pub market_value: Decimal,
}

impl fmt::Display for HoldingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ticker)?;
        if let Some(kind) = &self.kind {
            write!(f, " {kind}")?;
        }
        write!(f, " {}", format_whole_dollars(self.market_value))
    }
}

/// Rows with a blank ticker are skipped.
pub fn watched_from_table(
    source_key: &str,
    table: &Table,
) -> Result<Vec<WatchedTicker>, SalesIntelError> {
    require_columns(source_key, table, &[TICKER_COLUMN])?;
    let ticker_idx = table.column(TICKER_COLUMN).unwrap_or_default();
    let kind_idx = table.column(TYPE_COLUMN);
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let ticker = text(cell(row, ticker_idx))?;
            let kind = kind_idx.and_then(|idx| text(cell(row, idx)));
            Some(WatchedTicker { ticker, kind })
        })
        .collect())
}

pub fn positions_from_table(
    source_key: &str,
    table: &Table,
) -> Result<Vec<FiledPosition>, SalesIntelError> {
    require_columns(source_key, table, &[SYMBOL_COLUMN, MARKET_VALUE_COLUMN])?;
    let symbol_idx = table.column(SYMBOL_COLUMN).unwrap_or_default();
    let value_idx = table.column(MARKET_VALUE_COLUMN).unwrap_or_default();
    let kind_idx = table.column(TYPE_COLUMN);

    let mut positions = Vec::with_capacity(table.len());
    for (i, row) in table.rows.iter().enumerate() {
        let Some(symbol) = text(cell(row, symbol_idx)) else {
            continue;
        };
        let market_value = parse_dollar_amount(cell(row, value_idx)).map_err(|e| {
            SalesIntelError::source_unavailable(source_key, format!("line {}: {e}", i + 2))
        })?;
        positions.push(FiledPosition {
            symbol,
            kind: kind_idx.and_then(|idx| text(cell(row, idx))),
            market_value,
        });
    }
    Ok(positions)
}

/// Left join of `watched` onto `positions` by ticker = symbol.
///
/// A ticker with several positions yields one line per position. Missing
/// market values count as zero, values are truncated to whole dollars and
/// zero lines are dropped. Largest value first; ties keep ticker-list order.
/// The position's type wins over the ticker list's.
pub fn holdings_summary(watched: &[WatchedTicker], positions: &[FiledPosition]) -> Vec<HoldingLine> {
    let mut by_symbol: HashMap<&str, Vec<&FiledPosition>> = HashMap::new();
    for position in positions {
        by_symbol.entry(position.symbol.as_str()).or_default().push(position);
    }

    let by_symbol = &by_symbol;
    let mut lines: Vec<HoldingLine> = watched
        .iter()
        .flat_map(move |w| {
            by_symbol
                .get(w.ticker.as_str())
                .into_iter()
                .flatten()
                .map(move |p| HoldingLine {
                    ticker: w.ticker.clone(),
                    kind: p.kind.clone().or_else(|| w.kind.clone()),
                    market_value: p.market_value.unwrap_or_default().trunc(),
                })
        })
        .filter(|line| !line.market_value.is_zero())
        .collect();
    lines.sort_by(|a, b| b.market_value.cmp(&a.market_value));
    lines
}

/// One line per holding, newline separated.
pub fn render_holdings(lines: &[HoldingLine]) -> String {
    lines
        .iter()
        .map(HoldingLine::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
