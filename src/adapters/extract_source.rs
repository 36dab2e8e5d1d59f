//! Extract source: `[sources]` keys resolved to CSV or spreadsheet files and URLs.

use crate::domain::config_validation::skip_rows;
use crate::domain::error::SalesIntelError;
use crate::ports::config_port::ConfigPort;
use crate::ports::source_port::{SourcePort, Table};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const SOURCES_SECTION: &str = "sources";

const WORKBOOK_SUFFIXES: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractFormat {
    Csv,
    Workbook,
}

impl ExtractFormat {
    /// Decided by the file or URL suffix, ignoring any query string.
    /// Anything that is not a known spreadsheet suffix is read as CSV.
    pub fn from_location(raw: &str) -> Self {
        let path = raw.split(['?', '#']).next().unwrap_or(raw);
        let name = path.rsplit('/').next().unwrap_or(path);
        match name.rsplit_once('.') {
            Some((_, ext)) if WORKBOOK_SUFFIXES.contains(&ext.to_ascii_lowercase().as_str()) => {
                ExtractFormat::Workbook
            }
            _ => ExtractFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    Url(String),
}

impl SourceLocation {
    /// Relative paths are resolved against `base_dir`.
    pub fn parse(raw: &str, base_dir: &Path) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            SourceLocation::Url(raw.to_string())
        } else {
            let path = PathBuf::from(raw);
            if path.is_relative() {
                SourceLocation::File(base_dir.join(path))
            } else {
                SourceLocation::File(path)
            }
        }
    }

    pub fn format(&self) -> ExtractFormat {
        match self {
            SourceLocation::File(path) => ExtractFormat::from_location(&path.to_string_lossy()),
            SourceLocation::Url(url) => ExtractFormat::from_location(url),
        }
    }
}

pub struct ExtractSource {
    locations: BTreeMap<String, SourceLocation>,
    skip_rows: BTreeMap<String, usize>,
    #[cfg(feature = "http")]
    client: reqwest::blocking::Client,
}

impl ExtractSource {
    pub fn new(locations: BTreeMap<String, SourceLocation>) -> Self {
        Self {
            locations,
            skip_rows: BTreeMap::new(),
            #[cfg(feature = "http")]
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Locations from `[sources]`, leading rows to skip from `[skip_rows]`.
    pub fn from_config(config: &dyn ConfigPort, base_dir: &Path) -> Result<Self, SalesIntelError> {
        let locations = config
            .get_section(SOURCES_SECTION)
            .into_iter()
            .map(|(key, value)| (key, SourceLocation::parse(&value, base_dir)))
            .collect();
        let mut source = Self::new(locations);
        source.skip_rows = skip_rows(config)?;
        Ok(source)
    }

    /// Rows above the header to drop for `source_key`.
    pub fn with_skip_rows(mut self, source_key: &str, rows: usize) -> Self {
        self.skip_rows.insert(source_key.to_string(), rows);
        self
    }

    #[cfg(feature = "http")]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Result<Self, SalesIntelError> {
        self.client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("salesintel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SalesIntelError::source_unavailable("*", format!("http client: {e}")))?;
        Ok(self)
    }

    pub fn location(&self, source_key: &str) -> Option<&SourceLocation> {
        self.locations.get(source_key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }

    fn read_location(
        &self,
        source_key: &str,
        location: &SourceLocation,
    ) -> Result<Vec<u8>, SalesIntelError> {
        match location {
            SourceLocation::File(path) => fs::read(path).map_err(|e| {
                SalesIntelError::source_unavailable(
                    source_key,
                    format!("failed to read {}: {}", path.display(), e),
                )
            }),
            SourceLocation::Url(url) => self.fetch_url(source_key, url),
        }
    }

    #[cfg(feature = "http")]
    fn fetch_url(&self, source_key: &str, url: &str) -> Result<Vec<u8>, SalesIntelError> {
        log::info!("fetching {source_key} from {url}");
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map(|body| body.to_vec())
            .map_err(|e| SalesIntelError::source_unavailable(source_key, format!("GET {url}: {e}")))
    }

    #[cfg(not(feature = "http"))]
    fn fetch_url(&self, source_key: &str, url: &str) -> Result<Vec<u8>, SalesIntelError> {
        Err(SalesIntelError::source_unavailable(
            source_key,
            format!("{url} needs the `http` feature"),
        ))
    }
}

/// Header row after `skip_rows` leading rows; wholly blank data rows are dropped.
fn table_from_rows(
    source_key: &str,
    rows: Vec<Vec<String>>,
    skip_rows: usize,
) -> Result<Table, SalesIntelError> {
    let mut rows = rows.into_iter().skip(skip_rows);
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| SalesIntelError::source_unavailable(source_key, "no header row"))?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    let rows = rows
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .collect();
    Ok(Table::new(headers, rows))
}

/// Parses CSV text with a header row. Ragged rows are accepted.
pub fn parse_table(source_key: &str, content: &str, skip_rows: usize) -> Result<Table, SalesIntelError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            SalesIntelError::source_unavailable(source_key, format!("CSV parse error: {e}"))
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    table_from_rows(source_key, rows, skip_rows)
}

/// Reads the first sheet of an xlsx/xls/xlsb/ods workbook.
///
/// Cells come back as the text a CSV export of the same sheet would hold:
/// whole numbers without a fraction, dates as `YYYY-MM-DD`.
pub fn parse_workbook(
    source_key: &str,
    bytes: Vec<u8>,
    skip_rows: usize,
) -> Result<Table, SalesIntelError> {
    let fail = |e: calamine::Error| {
        SalesIntelError::source_unavailable(source_key, format!("spreadsheet: {e}"))
    };
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(fail)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SalesIntelError::source_unavailable(source_key, "workbook has no sheets"))?
        .map_err(fail)?;

    // The range starts at the first used row, so rows above it already count as skipped.
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    table_from_rows(source_key, rows, skip_rows.saturating_sub(first_row))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_datetime().map(datetime_text).unwrap_or_default(),
        Data::DateTimeIso(s) => s.replacen('T', " ", 1),
        Data::DurationIso(s) => s.clone(),
    }
}

fn datetime_text(dt: NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl SourcePort for ExtractSource {
    fn fetch(&self, source_key: &str) -> Result<Table, SalesIntelError> {
        let location = self.location(source_key).ok_or_else(|| {
            SalesIntelError::source_unavailable(
                source_key,
                format!("no [{SOURCES_SECTION}] entry for {source_key}"),
            )
        })?;
        let skip = self.skip_rows.get(source_key).copied().unwrap_or(0);
        let bytes = self.read_location(source_key, location)?;
        match location.format() {
            ExtractFormat::Workbook => parse_workbook(source_key, bytes, skip),
            ExtractFormat::Csv => {
                let content = String::from_utf8(bytes).map_err(|e| {
                    SalesIntelError::source_unavailable(
                        source_key,
                        format!("CSV extract is not UTF-8 text: {e}"),
                    )
                })?;
                parse_table(source_key, &content, skip)
            }
        }
    }

    fn contains(&self, source_key: &str) -> bool {
        self.locations.contains_key(source_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    fn source_for(key: &str, path: PathBuf) -> ExtractSource {
        ExtractSource::new(BTreeMap::from([(key.to_string(), SourceLocation::File(path))]))
    }

    #[test]
    fn fetch_reads_headers_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "etf.csv", "Date,Zip,AUM\n2024-01-31,02134,\"1,000\"\n");
        let table = source_for("etf", path).fetch("etf").unwrap();
        assert_eq!(table.headers, vec!["Date", "Zip", "AUM"]);
        assert_eq!(table.rows, vec![vec!["2024-01-31", "02134", "1,000"]]);
    }

    #[test]
    fn fetch_keeps_leading_zeros_and_strips_bom() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "z.csv", "\u{feff}Zip,State\n00501,NY\n");
        let table = source_for("zips", path).fetch("zips").unwrap();
        assert_eq!(table.column("Zip"), Some(0));
        assert_eq!(table.rows[0][0], "00501");
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "r.csv", "A,B,C\n1,2\n");
        let table = source_for("r", path).fetch("r").unwrap();
        assert_eq!(table.rows[0].len(), 2);
    }

    #[test]
    fn skip_rows_drops_banner_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "ww.csv",
            "Holdings report\nAs of 2024-03-31,\nFiler: Example,\nSymbol,Market Value\nKNG,1000\n",
        );
        let table = source_for("ww", path).with_skip_rows("ww", 3).fetch("ww").unwrap();
        assert_eq!(table.headers, vec!["Symbol", "Market Value"]);
        assert_eq!(table.rows, vec![vec!["KNG", "1000"]]);
    }

    #[test]
    fn unknown_key_is_unavailable() {
        let source = ExtractSource::new(BTreeMap::new());
        let err = source.fetch("etf").unwrap_err();
        assert!(matches!(err, SalesIntelError::SourceUnavailable { .. }));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let source = source_for("etf", PathBuf::from("/nonexistent/etf.csv"));
        let err = source.fetch("etf").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/etf.csv"));
    }

    #[test]
    fn locations_resolve_against_base_dir() {
        let base = Path::new("/data");
        assert_eq!(
            SourceLocation::parse("etf.csv", base),
            SourceLocation::File(PathBuf::from("/data/etf.csv"))
        );
        assert_eq!(
            SourceLocation::parse("/abs/etf.csv", base),
            SourceLocation::File(PathBuf::from("/abs/etf.csv"))
        );
        assert_eq!(
            SourceLocation::parse(" https://host/etf.csv ", base),
            SourceLocation::Url("https://host/etf.csv".to_string())
        );
    }

    #[test]
    fn from_config_takes_locations_from_sources_only() {
        use crate::adapters::file_config_adapter::FileConfigAdapter;

        let config = FileConfigAdapter::from_string(
            "[sources]\netf = etf.csv\nww = ww.xlsx\n\n[http]\ntimeout_secs = 30\n\n[skip_rows]\nww = 3\n",
        )
        .unwrap();
        let source = ExtractSource::from_config(&config, Path::new("/data")).unwrap();
        assert_eq!(source.keys().collect::<Vec<_>>(), vec!["etf", "ww"]);
        assert!(!source.contains("timeout_secs"));
        assert_eq!(source.skip_rows.get("ww"), Some(&3));
        assert_eq!(source.location("ww").map(SourceLocation::format), Some(ExtractFormat::Workbook));
    }

    #[test]
    fn format_follows_suffix() {
        assert_eq!(ExtractFormat::from_location("/data/etf.XLSX"), ExtractFormat::Workbook);
        assert_eq!(ExtractFormat::from_location("legacy.xls"), ExtractFormat::Workbook);
        assert_eq!(
            ExtractFormat::from_location("https://host/etf.xlsx?raw=true"),
            ExtractFormat::Workbook
        );
        assert_eq!(ExtractFormat::from_location("https://host.example.com/etf"), ExtractFormat::Csv);
        assert_eq!(ExtractFormat::from_location("etf.csv"), ExtractFormat::Csv);
    }

    #[test]
    fn fetch_reads_first_sheet_of_xlsx() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("etf.xlsx");
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Date", "State", "Zip", "AUM"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        let date = ExcelDateTime::from_ymd(2024, 1, 31).unwrap();
        sheet.write_datetime_with_format(1, 0, &date, &date_format).unwrap();
        sheet.write_string(1, 1, "MA").unwrap();
        sheet.write_string(1, 2, "02134").unwrap();
        sheet.write_number(1, 3, 100).unwrap();
        sheet.write_number(2, 0, 45351).unwrap();
        sheet.write_string(2, 1, "TX").unwrap();
        sheet.write_number(2, 2, 501).unwrap();
        sheet.write_number(2, 3, 12.5).unwrap();
        workbook.save(&path).unwrap();

        let table = source_for("etf", path).fetch("etf").unwrap();
        assert_eq!(table.headers, vec!["Date", "State", "Zip", "AUM"]);
        assert_eq!(table.rows[0], vec!["2024-01-31", "MA", "02134", "100"]);
        // Unformatted serials and numeric zips come back as plain numbers.
        assert_eq!(table.rows[1], vec!["45351", "TX", "501", "12.5"]);
    }

    #[test]
    fn xlsx_rows_feed_the_sales_loader() {
        use crate::domain::loader::sales_from_table;
        use crate::domain::period::Period;
        use crate::domain::schema::SalesSchema;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("etf.xlsx");
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("mm/dd/yyyy");
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Date", "State", "Zip", "AUM"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        let date = ExcelDateTime::from_ymd(2024, 2, 29).unwrap();
        sheet.write_datetime_with_format(1, 0, &date, &date_format).unwrap();
        sheet.write_string(1, 1, "NY").unwrap();
        sheet.write_number(1, 2, 501).unwrap();
        sheet.write_number(1, 3, 1000).unwrap();
        workbook.save(&path).unwrap();

        let table = source_for("etf", path).fetch("etf").unwrap();
        let records = sales_from_table("etf", &table, &SalesSchema::etf()).unwrap();
        assert_eq!(records[0].period, Period::new(2024, 2).unwrap());
        assert_eq!(records[0].zip5().as_deref(), Some("00501"));
    }

    #[test]
    fn corrupt_workbook_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "etf.xlsx", "Date,State\n2024-01-31,MA\n");
        let err = source_for("etf", path).fetch("etf").unwrap_err();
        assert!(err.to_string().contains("spreadsheet"), "{err}");
    }
}
