//! Grouped sums, pivots, deltas and top-N listings over sales records.

use crate::domain::period::{Period, PeriodWindow};
use crate::domain::record::{GroupKey, Measure, SalesRecord, UNKNOWN_LABEL};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Group key values for one row; `None` is the Unknown bucket.
pub type KeyTuple = Vec<Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingRow {
    pub key: KeyTuple,
    pub value: Decimal,
    /// Number of records in the group.
    pub count: usize,
}

impl RankingRow {
    pub fn labels(&self) -> Vec<&str> {
        key_labels(&self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub group_keys: Vec<GroupKey>,
    pub measure: Measure,
    pub rows: Vec<RankingRow>,
}

impl Ranking {
    pub fn total(&self) -> Decimal {
        self.rows.iter().map(|r| r.value).sum()
    }

    /// Summed value for an exact key tuple, if that group exists.
    pub fn get(&self, key: &[Option<&str>]) -> Option<Decimal> {
        self.rows
            .iter()
            .find(|r| r.key.iter().map(Option::as_deref).eq(key.iter().copied()))
            .map(|r| r.value)
    }

    pub fn sort(&mut self, order: SortOrder) {
        self.rows.sort_by(|a, b| {
            compare_values(a.value, b.value, order).then_with(|| compare_keys(&a.key, &b.key))
        });
    }

    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }
}

/// Sums `measure` per distinct tuple of `group_keys`, largest first.
///
/// Null measure values contribute nothing; a group whose values are all null
/// sums to zero. Records with null key values form their own group.
pub fn aggregate(records: &[SalesRecord], group_keys: &[GroupKey], measure: Measure) -> Ranking {
    let mut groups: HashMap<KeyTuple, (Decimal, usize)> = HashMap::new();
    for record in records {
        let entry = groups
            .entry(key_tuple(record, group_keys))
            .or_insert((Decimal::ZERO, 0));
        entry.0 += record.measure(measure).unwrap_or(Decimal::ZERO);
        entry.1 += 1;
    }

    let mut ranking = Ranking {
        group_keys: group_keys.to_vec(),
        measure,
        rows: groups
            .into_iter()
            .map(|(key, (value, count))| RankingRow { key, value, count })
            .collect(),
    };
    ranking.sort(SortOrder::Descending);
    ranking
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotRow {
    pub key: KeyTuple,
    /// One cell per pivot column; `None` means no records for that combination.
    pub cells: Vec<Option<Decimal>>,
    pub total: Decimal,
}

impl PivotRow {
    pub fn labels(&self) -> Vec<&str> {
        key_labels(&self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable {
    pub row_keys: Vec<GroupKey>,
    pub column_key: GroupKey,
    pub measure: Measure,
    pub columns: Vec<Option<String>>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    pub fn column_labels(&self) -> Vec<&str> {
        key_labels(&self.columns)
    }

    pub fn cell(&self, row: &[Option<&str>], column: Option<&str>) -> Option<Decimal> {
        let col = self.columns.iter().position(|c| c.as_deref() == column)?;
        self.rows
            .iter()
            .find(|r| r.key.iter().map(Option::as_deref).eq(row.iter().copied()))
            .and_then(|r| r.cells[col])
    }

    /// Orders rows by their total across all columns.
    pub fn sort(&mut self, order: SortOrder) {
        self.rows.sort_by(|a, b| {
            compare_values(a.total, b.total, order).then_with(|| compare_keys(&a.key, &b.key))
        });
    }

    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }
}

/// Row-key tuples down the side, distinct `column_key` values across the top.
pub fn pivot(
    records: &[SalesRecord],
    row_keys: &[GroupKey],
    column_key: GroupKey,
    measure: Measure,
) -> PivotTable {
    let mut sums: HashMap<(KeyTuple, Option<String>), Decimal> = HashMap::new();
    let mut row_set: HashMap<KeyTuple, Decimal> = HashMap::new();
    let mut column_set: BTreeSet<Option<String>> = BTreeSet::new();

    for record in records {
        let row = key_tuple(record, row_keys);
        let column = record.key(column_key).map(str::to_string);
        let value = record.measure(measure).unwrap_or(Decimal::ZERO);

        *sums.entry((row.clone(), column.clone())).or_insert(Decimal::ZERO) += value;
        *row_set.entry(row).or_insert(Decimal::ZERO) += value;
        column_set.insert(column);
    }

    let mut columns: Vec<Option<String>> = column_set.into_iter().collect();
    columns.sort_by(|a, b| compare_key_values(a, b));

    let rows: Vec<PivotRow> = row_set
        .into_iter()
        .map(|(key, total)| {
            let cells = columns
                .iter()
                .map(|c| sums.get(&(key.clone(), c.clone())).copied())
                .collect();
            PivotRow { key, cells, total }
        })
        .collect();

    let mut table = PivotTable {
        row_keys: row_keys.to_vec(),
        column_key,
        measure,
        columns,
        rows,
    };
    table.sort(SortOrder::Descending);
    table
}

/// Sum of a measure; an empty slice sums to zero.
pub fn sum(records: &[SalesRecord], measure: Measure) -> Decimal {
    records.iter().filter_map(|r| r.measure(measure)).sum()
}

/// `sum(current) - sum(previous)`.
pub fn delta(current: &[SalesRecord], previous: &[SalesRecord], measure: Measure) -> Decimal {
    sum(current, measure) - sum(previous, measure)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDelta {
    pub current: Decimal,
    pub previous: Decimal,
    pub change: Decimal,
}

impl MetricDelta {
    pub fn compute(window: &PeriodWindow, measure: Measure) -> Self {
        let current = sum(&window.current, measure);
        let previous = sum(&window.previous, measure);
        Self {
            current,
            previous,
            change: current - previous,
        }
    }
}

/// AUM and NNA for the selected period with month-over-month change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodSummary {
    pub period: Period,
    pub previous_period: Period,
    pub aum: MetricDelta,
    pub nna: MetricDelta,
}

impl PeriodSummary {
    pub fn compute(window: &PeriodWindow) -> Self {
        Self {
            period: window.selected,
            previous_period: window.previous_period,
            aum: MetricDelta::compute(window, Measure::Aum),
            nna: MetricDelta::compute(window, Measure::Nna),
        }
    }
}

/// Measure total for every period present, oldest first.
pub fn totals_by_period(records: &[SalesRecord], measure: Measure) -> Vec<(Period, Decimal)> {
    let mut totals: BTreeMap<Period, Decimal> = BTreeMap::new();
    for record in records {
        *totals.entry(record.period).or_insert(Decimal::ZERO) +=
            record.measure(measure).unwrap_or(Decimal::ZERO);
    }
    totals.into_iter().collect()
}

/// Individual records ordered by a measure. Records with a null measure are skipped.
pub fn top_records(
    records: &[SalesRecord],
    measure: Measure,
    order: SortOrder,
    limit: Option<usize>,
) -> Vec<SalesRecord> {
    let mut ranked: Vec<(Decimal, &SalesRecord)> = records
        .iter()
        .filter_map(|r| r.measure(measure).map(|v| (v, r)))
        .collect();
    ranked.sort_by(|a, b| compare_values(a.0, b.0, order));
    let take = limit.unwrap_or(ranked.len());
    ranked.into_iter().take(take).map(|(_, r)| r.clone()).collect()
}

fn key_tuple(record: &SalesRecord, keys: &[GroupKey]) -> KeyTuple {
    keys.iter()
        .map(|k| record.key(*k).map(str::to_string))
        .collect()
}

fn key_labels(key: &[Option<String>]) -> Vec<&str> {
    key.iter()
        .map(|k| k.as_deref().unwrap_or(UNKNOWN_LABEL))
        .collect()
}

fn compare_values(a: Decimal, b: Decimal, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Descending => b.cmp(&a),
        SortOrder::Ascending => a.cmp(&b),
    }
}

/// Known values first, Unknown last.
fn compare_key_values(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_keys(a: &[Option<String>], b: &[Option<String>]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_key_values(x, y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}
