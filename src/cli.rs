//! CLI definition and dispatch.
//!
//! Each reporting subcommand loads the product extract, applies the user's
//! selection and renders one table, to the terminal or to a CSV/XLSX file.
//! `holdings` instead matches a ticker list against a 13F export.

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_export::CsvExport;
use crate::adapters::extract_source::ExtractSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::xlsx_export::XlsxExport;
use crate::domain::aggregate::{PeriodSummary, SortOrder, top_records};
use crate::domain::category::CategoryMapping;
use crate::domain::config_validation::{
    cache_ttl, default_export_format, ticker_set, validate_config,
};
#[cfg(feature = "http")]
use crate::domain::config_validation::http_timeout;
use crate::domain::dataset::load_dataset;
use crate::domain::error::SalesIntelError;
use crate::domain::export::{ExportFormat, ExportTable};
use crate::domain::filter::{FieldFilter, RecordFilter};
use crate::domain::firm_lookup::firm_lookup;
use crate::domain::holdings::{
    holdings_summary, positions_from_table, render_holdings, watched_from_table,
};
use crate::domain::loader::SourceLoader;
use crate::domain::period::{Period, available_periods, latest_period, select_period};
use crate::domain::ranking::{FilterSelection, RankingResult, rank};
use crate::domain::record::{GroupKey, Measure, SalesRecord};
use crate::domain::schema::SalesSchema;
use crate::domain::territory::JoinKey;
use crate::ports::config_port::ConfigPort;
use crate::ports::export_port::ExportPort;
use crate::ports::source_port::SourcePort;

#[derive(Parser, Debug)]
#[command(name = "salesintel", about = "Sales AUM/NNA reporting by wholesaler, category and period")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[arg(short, long)]
    pub config: PathBuf,
    /// Product extract: mutual_fund, etf or uit
    #[arg(short = 'P', long, default_value = "mutual_fund")]
    pub product: String,
    /// Territory join: state, zip or zip-then-state
    #[arg(long)]
    pub join: Option<JoinKey>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Reporting period (YYYY-MM); defaults to the latest in the extract
    #[arg(short, long)]
    pub period: Option<Period>,
    /// Column filter, e.g. channel=RIA,BD (repeatable; Unknown selects blanks)
    #[arg(long = "filter")]
    pub filters: Vec<FieldFilter>,
    /// Restrict to a ticker set from [tickers]
    #[arg(long)]
    pub ticker_set: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the reporting periods in an extract
    Periods {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// AUM and NNA for a period against the month before
    Summary {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rank groups by a summed measure
    Rank {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        selection: SelectionArgs,
        /// Group keys, comma separated
        #[arg(long, value_delimiter = ',', default_value = "wholesaler")]
        by: Vec<GroupKey>,
        #[arg(long, default_value = "aum")]
        measure: Measure,
        /// Pivot this key into columns
        #[arg(long)]
        split_by: Option<GroupKey>,
        #[arg(long)]
        ascending: bool,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Largest clients, inflows or outflows
    Clients {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long, default_value = "aum")]
        measure: Measure,
        #[arg(long)]
        ascending: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Industry figures per category for a list of firms
    Lookup {
        #[command(flatten)]
        source: SourceArgs,
        /// Firm names separated by ';'
        #[arg(long, value_delimiter = ';')]
        firms: Vec<String>,
        /// File with one firm name per line
        #[arg(long)]
        firms_file: Option<PathBuf>,
        #[arg(long = "filter")]
        filters: Vec<FieldFilter>,
        #[arg(long, default_value = "industry-aum")]
        measure: Measure,
        /// Only list firms that have data
        #[arg(long)]
        matched_only: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the selected period's records to a file
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// 13F holdings of a ticker list, largest market value first
    Holdings {
        #[arg(short, long)]
        config: PathBuf,
        /// Source key of the ticker list (a Ticker column)
        #[arg(long, default_value = "holdings_tickers")]
        tickers: String,
        /// Source key of the 13F export (Symbol and Market Value columns)
        #[arg(long, default_value = "whalewisdom")]
        filing: String,
        /// Write the summary text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Periods { source } => run_periods(&source),
        Command::Summary {
            source,
            selection,
            output,
        } => run_summary(&source, &selection, output.as_deref()),
        Command::Rank {
            source,
            selection,
            by,
            measure,
            split_by,
            ascending,
            limit,
            output,
        } => {
            let request = RankRequest {
                by,
                measure,
                split_by,
                order: sort_order(ascending),
                limit,
            };
            run_rank(&source, &selection, &request, output.as_deref())
        }
        Command::Clients {
            source,
            selection,
            measure,
            ascending,
            limit,
            output,
        } => run_clients(
            &source,
            &selection,
            measure,
            sort_order(ascending),
            limit,
            output.as_deref(),
        ),
        Command::Lookup {
            source,
            firms,
            firms_file,
            filters,
            measure,
            matched_only,
            output,
        } => run_lookup(
            &source,
            firms,
            firms_file.as_deref(),
            filters,
            measure,
            matched_only,
            output.as_deref(),
        ),
        Command::Export {
            source,
            selection,
            output,
        } => run_export(&source, &selection, &output),
        Command::Holdings {
            config,
            tickers,
            filing,
            output,
        } => run_holdings(&config, &tickers, &filing, output.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn sort_order(ascending: bool) -> SortOrder {
    if ascending {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SalesIntelError> {
    let adapter =
        FileConfigAdapter::from_file(path).map_err(|e| SalesIntelError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
    validate_config(&adapter)?;
    Ok(adapter)
}

/// Loaded configuration plus the joined records of one product.
pub struct Workspace {
    pub config: FileConfigAdapter,
    pub records: Vec<SalesRecord>,
}

pub fn resolve_schema(product: &str) -> Result<SalesSchema, SalesIntelError> {
    SalesSchema::by_name(product).ok_or_else(|| SalesIntelError::ConfigInvalid {
        section: "sources".to_string(),
        key: product.to_string(),
        reason: format!("unknown product, expected one of {}", SalesSchema::NAMES.join(", ")),
    })
}

pub fn open_workspace(args: &SourceArgs) -> Result<Workspace, SalesIntelError> {
    eprintln!("Loading config from {}", args.config.display());
    let config = load_config(&args.config)?;
    let schema = resolve_schema(&args.product)?;

    let source = extract_source(&config, &args.config)?;
    let loader = SourceLoader::new(source, cache_ttl(&config)?);

    let categories = CategoryMapping::from_config(&config);
    let records = load_dataset(&loader, &schema, args.join, &categories)?;
    eprintln!("Loaded {} {} records", records.len(), schema);
    Ok(Workspace { config, records })
}

/// `[sources]` resolved against the config file's directory.
pub fn extract_source(
    config: &FileConfigAdapter,
    config_path: &Path,
) -> Result<ExtractSource, SalesIntelError> {
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let source = ExtractSource::from_config(config, &base_dir)?;
    #[cfg(feature = "http")]
    let source = source.with_timeout(http_timeout(config)?)?;
    Ok(source)
}

/// Field filters plus the optional ticker set.
pub fn build_filter(
    config: &dyn ConfigPort,
    filters: &[FieldFilter],
    ticker_set_name: Option<&str>,
) -> Result<RecordFilter, SalesIntelError> {
    let mut filter = filters
        .iter()
        .cloned()
        .fold(RecordFilter::new(), RecordFilter::with);
    if let Some(name) = ticker_set_name {
        filter = filter.with(FieldFilter::new(GroupKey::Ticker, ticker_set(config, name)?));
    }
    Ok(filter)
}

/// The requested period, else the latest one in the whole extract.
///
/// Filters never move the default, so every subcommand reports the same
/// month for the same extract.
pub fn resolve_period(requested: Option<Period>, records: &[SalesRecord]) -> Option<Period> {
    requested.or_else(|| latest_period(records))
}

fn run_periods(source: &SourceArgs) -> Result<(), SalesIntelError> {
    let workspace = open_workspace(source)?;
    let periods = available_periods(&workspace.records);
    if periods.is_empty() {
        eprintln!("No periods found");
    } else {
        for period in &periods {
            println!("{period}");
        }
        eprintln!("{} periods found", periods.len());
    }
    Ok(())
}

pub fn summary_table(
    records: &[SalesRecord],
    period: Option<Period>,
    filter: &RecordFilter,
) -> Option<ExportTable> {
    let period = resolve_period(period, records)?;
    let scoped = filter.apply(records);
    let window = select_period(&scoped, period);
    let summary = PeriodSummary::compute(&window);
    Some(ExportTable::from_summary(
        &format!("Summary {period}"),
        &summary,
    ))
}

fn run_summary(
    source: &SourceArgs,
    selection: &SelectionArgs,
    output: Option<&Path>,
) -> Result<(), SalesIntelError> {
    let workspace = open_workspace(source)?;
    let filter = build_filter(
        &workspace.config,
        &selection.filters,
        selection.ticker_set.as_deref(),
    )?;
    match summary_table(&workspace.records, selection.period, &filter) {
        Some(table) => emit(&workspace.config, &table, output),
        None => {
            eprintln!("No records to summarise");
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankRequest {
    pub by: Vec<GroupKey>,
    pub measure: Measure,
    pub split_by: Option<GroupKey>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

pub fn rank_table(
    records: &[SalesRecord],
    period: Option<Period>,
    filter: RecordFilter,
    request: &RankRequest,
) -> ExportTable {
    let mut selection = FilterSelection::new(request.by.clone(), request.measure)
        .with_filter(filter)
        .ordered(request.order);
    if let Some(period) = resolve_period(period, records) {
        selection = selection.for_period(period);
    }
    if let Some(key) = request.split_by {
        selection = selection.split_by(key);
    }
    if let Some(limit) = request.limit {
        selection = selection.limit(limit);
    }

    let keys: Vec<&str> = request.by.iter().map(|k| k.label()).collect();
    let sheet = format!("{} by {}", request.measure.label(), keys.join(", "));
    match rank(records, &selection) {
        RankingResult::Grouped(ranking) => ExportTable::from_ranking(&sheet, &ranking),
        RankingResult::Pivoted(pivot) => ExportTable::from_pivot(&sheet, &pivot),
    }
}

fn run_rank(
    source: &SourceArgs,
    selection: &SelectionArgs,
    request: &RankRequest,
    output: Option<&Path>,
) -> Result<(), SalesIntelError> {
    let workspace = open_workspace(source)?;
    let filter = build_filter(
        &workspace.config,
        &selection.filters,
        selection.ticker_set.as_deref(),
    )?;
    let table = rank_table(&workspace.records, selection.period, filter, request);
    emit(&workspace.config, &table, output)
}

/// Records of the period that pass the filter.
pub fn scoped_records(
    records: &[SalesRecord],
    period: Option<Period>,
    filter: &RecordFilter,
) -> Vec<SalesRecord> {
    let period = resolve_period(period, records);
    records
        .iter()
        .filter(|r| period.is_none_or(|p| r.period == p) && filter.matches(r))
        .cloned()
        .collect()
}

pub fn clients_table(
    records: &[SalesRecord],
    period: Option<Period>,
    filter: &RecordFilter,
    measure: Measure,
    order: SortOrder,
    limit: usize,
) -> ExportTable {
    let scoped = scoped_records(records, period, filter);
    let top = top_records(&scoped, measure, order, Some(limit));
    let heading = match (measure, order) {
        (Measure::Nna, SortOrder::Descending) => format!("Top {limit} Inflows"),
        (Measure::Nna, SortOrder::Ascending) => format!("Top {limit} Outflows"),
        _ => format!("Top {limit} Clients"),
    };
    ExportTable::from_records(&heading, &top)
}

fn run_clients(
    source: &SourceArgs,
    selection: &SelectionArgs,
    measure: Measure,
    order: SortOrder,
    limit: usize,
    output: Option<&Path>,
) -> Result<(), SalesIntelError> {
    let workspace = open_workspace(source)?;
    let filter = build_filter(
        &workspace.config,
        &selection.filters,
        selection.ticker_set.as_deref(),
    )?;
    let table = clients_table(
        &workspace.records,
        selection.period,
        &filter,
        measure,
        order,
        limit,
    );
    emit(&workspace.config, &table, output)
}

fn read_firm_names(path: &Path) -> Result<Vec<String>, SalesIntelError> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_string).collect())
}

fn run_lookup(
    source: &SourceArgs,
    mut firms: Vec<String>,
    firms_file: Option<&Path>,
    filters: Vec<FieldFilter>,
    measure: Measure,
    matched_only: bool,
    output: Option<&Path>,
) -> Result<(), SalesIntelError> {
    if let Some(path) = firms_file {
        firms.extend(read_firm_names(path)?);
    }
    if firms.iter().all(|f| f.trim().is_empty()) {
        eprintln!("No firm names given (use --firms or --firms-file)");
        return Ok(());
    }

    let workspace = open_workspace(source)?;
    let filter = build_filter(&workspace.config, &filters, None)?;
    let mut lookup = firm_lookup(&workspace.records, &firms, &filter, measure);
    if matched_only {
        lookup.ordered.retain(|r| r.has_data());
    }
    let table = ExportTable::from_firm_lookup(&format!("{} Lookup", measure.label()), &lookup);
    emit(&workspace.config, &table, output)
}

fn run_export(
    source: &SourceArgs,
    selection: &SelectionArgs,
    output: &Path,
) -> Result<(), SalesIntelError> {
    let workspace = open_workspace(source)?;
    let filter = build_filter(
        &workspace.config,
        &selection.filters,
        selection.ticker_set.as_deref(),
    )?;
    let records = scoped_records(&workspace.records, selection.period, &filter);
    let sheet = match resolve_period(selection.period, &workspace.records) {
        Some(p) => format!("{} {p}", source.product),
        None => source.product.clone(),
    };
    let table = ExportTable::from_records(&sheet, &records);
    let format = default_export_format(&workspace.config)?;
    write_output(&table, output, format)
}

fn run_holdings(
    config_path: &Path,
    tickers_key: &str,
    filing_key: &str,
    output: Option<&Path>,
) -> Result<(), SalesIntelError> {
    let config = load_config(config_path)?;
    let source = extract_source(&config, config_path)?;
    let watched = watched_from_table(tickers_key, &source.fetch(tickers_key)?)?;
    let positions = positions_from_table(filing_key, &source.fetch(filing_key)?)?;
    log::info!(
        "matching {} tickers against {} filed positions",
        watched.len(),
        positions.len()
    );

    let lines = holdings_summary(&watched, &positions);
    let text = render_holdings(&lines);
    match output {
        Some(path) => {
            let body = if text.is_empty() { text } else { format!("{text}\n") };
            fs::write(path, body)?;
            eprintln!("Wrote {} holdings to {}", lines.len(), path.display());
        }
        None if lines.is_empty() => eprintln!("No watched ticker has a market value"),
        None => println!("{text}"),
    }
    Ok(())
}

fn emit(
    config: &FileConfigAdapter,
    table: &ExportTable,
    output: Option<&Path>,
) -> Result<(), SalesIntelError> {
    match output {
        Some(path) => write_output(table, path, default_export_format(config)?),
        None => {
            print!("{}", render_table(table));
            eprintln!("{} rows", table.rows.len());
            Ok(())
        }
    }
}

pub fn exporter_for(format: ExportFormat) -> Box<dyn ExportPort> {
    match format {
        ExportFormat::Csv => Box::new(CsvExport),
        ExportFormat::Xlsx => Box::new(XlsxExport),
    }
}

/// Format follows the file extension, falling back to `default`.
pub fn write_output(
    table: &ExportTable,
    path: &Path,
    default: ExportFormat,
) -> Result<(), SalesIntelError> {
    let format = ExportFormat::from_path(path).unwrap_or(default);
    let bytes = exporter_for(format).export(table)?;
    fs::write(path, bytes)?;
    eprintln!(
        "Wrote {} rows to {} ({format})",
        table.rows.len(),
        path.display()
    );
    Ok(())
}

/// Plain-text table with columns padded to their widest cell.
pub fn render_table(table: &ExportTable) -> String {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&table.headers));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in &table.rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}
