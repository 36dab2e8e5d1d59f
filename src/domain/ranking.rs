//! Ranking requests as plain values.
//!
//! Each user interaction is captured as a [`FilterSelection`] and turned into
//! a [`RankingResult`] by [`rank`], with no rendering concerns involved.

use crate::domain::aggregate::{PivotTable, Ranking, SortOrder, aggregate, pivot};
use crate::domain::filter::RecordFilter;
use crate::domain::period::Period;
use crate::domain::record::{GroupKey, Measure, SalesRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    /// `None` ranks across every period in the records.
    pub period: Option<Period>,
    pub filter: RecordFilter,
    pub group_keys: Vec<GroupKey>,
    pub measure: Measure,
    /// Splits the ranking into one column per distinct value of this key.
    pub split_by: Option<GroupKey>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl FilterSelection {
    pub fn new(group_keys: Vec<GroupKey>, measure: Measure) -> Self {
        Self {
            period: None,
            filter: RecordFilter::default(),
            group_keys,
            measure,
            split_by: None,
            order: SortOrder::Descending,
            limit: None,
        }
    }

    pub fn for_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn split_by(mut self, key: GroupKey) -> Self {
        self.split_by = Some(key);
        self
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Period and field filters. Rows that fail a filter are dropped, never
    /// kept with blanked values. Rows without a value for a nullable measure
    /// are dropped too, so an all-null group does not show up as zero.
    pub fn matches(&self, record: &SalesRecord) -> bool {
        self.period.is_none_or(|p| record.period == p)
            && self.filter.matches(record)
            && record.measure(self.measure).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankingResult {
    Grouped(Ranking),
    Pivoted(PivotTable),
}

impl RankingResult {
    pub fn row_count(&self) -> usize {
        match self {
            RankingResult::Grouped(r) => r.rows.len(),
            RankingResult::Pivoted(t) => t.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

pub fn rank(records: &[SalesRecord], selection: &FilterSelection) -> RankingResult {
    let scoped: Vec<SalesRecord> = records
        .iter()
        .filter(|r| selection.matches(r))
        .cloned()
        .collect();

    log::debug!(
        "ranking {} of {} records by {:?} ({})",
        scoped.len(),
        records.len(),
        selection.group_keys,
        selection.measure
    );

    match selection.split_by {
        Some(column) => {
            let mut table = pivot(&scoped, &selection.group_keys, column, selection.measure);
            table.sort(selection.order);
            if let Some(limit) = selection.limit {
                table.truncate(limit);
            }
            RankingResult::Pivoted(table)
        }
        None => {
            let mut ranking = aggregate(&scoped, &selection.group_keys, selection.measure);
            ranking.sort(selection.order);
            if let Some(limit) = selection.limit {
                ranking.truncate(limit);
            }
            RankingResult::Grouped(ranking)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::FieldFilter;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn p(m: u32) -> Period {
        Period::new(2024, m).unwrap()
    }

    fn rec(month: u32, outsider: Option<&str>, ticker: &str, aum: Decimal) -> SalesRecord {
        let mut r = SalesRecord::new(p(month), aum);
        r.outsiders.etf = outsider.map(str::to_string);
        r.ticker = Some(ticker.to_string());
        r
    }

    fn sample() -> Vec<SalesRecord> {
        vec![
            rec(1, Some("Ann"), "KNG", dec!(100)),
            rec(2, Some("Ann"), "KNG", dec!(150)),
            rec(2, Some("Bob"), "KNG", dec!(300)),
            rec(2, Some("Bob"), "BUFR", dec!(20)),
            rec(2, None, "KNG", dec!(5)),
        ]
    }

    #[test]
    fn rank_filters_period_before_grouping() {
        let selection =
            FilterSelection::new(vec![GroupKey::EtfOutsider], Measure::Aum).for_period(p(2));
        let RankingResult::Grouped(ranking) = rank(&sample(), &selection) else {
            panic!("expected grouped ranking");
        };
        assert_eq!(ranking.get(&[Some("Bob")]), Some(dec!(320)));
        assert_eq!(ranking.get(&[Some("Ann")]), Some(dec!(150)));
        assert_eq!(ranking.get(&[None]), Some(dec!(5)));
        assert_eq!(ranking.rows[0].key[0].as_deref(), Some("Bob"));
    }

    #[test]
    fn rank_excludes_rows_failing_filters() {
        let selection = FilterSelection::new(vec![GroupKey::EtfOutsider], Measure::Aum)
            .for_period(p(2))
            .with_filter(RecordFilter::new().with(FieldFilter::new(GroupKey::Ticker, ["BUFR"])));
        let result = rank(&sample(), &selection);
        let RankingResult::Grouped(ranking) = result else {
            panic!("expected grouped ranking");
        };
        assert_eq!(ranking.rows.len(), 1);
        assert_eq!(ranking.get(&[Some("Bob")]), Some(dec!(20)));
    }

    #[test]
    fn rank_split_by_ticker_pivots() {
        let selection = FilterSelection::new(vec![GroupKey::EtfOutsider], Measure::Aum)
            .for_period(p(2))
            .split_by(GroupKey::Ticker);
        let RankingResult::Pivoted(table) = rank(&sample(), &selection) else {
            panic!("expected pivot");
        };
        assert_eq!(table.column_labels(), vec!["BUFR", "KNG"]);
        assert_eq!(table.cell(&[Some("Ann")], Some("BUFR")), None);
        assert_eq!(table.cell(&[Some("Bob")], Some("BUFR")), Some(dec!(20)));
    }

    #[test]
    fn rank_ascending_with_limit() {
        let selection = FilterSelection::new(vec![GroupKey::EtfOutsider], Measure::Aum)
            .for_period(p(2))
            .ordered(SortOrder::Ascending)
            .limit(2);
        let RankingResult::Grouped(ranking) = rank(&sample(), &selection) else {
            panic!("expected grouped ranking");
        };
        let keys: Vec<_> = ranking.rows.iter().map(|r| r.labels()[0].to_string()).collect();
        assert_eq!(keys, vec!["Unknown", "Ann"]);
    }

    #[test]
    fn nna_ranking_drops_null_rows() {
        let mut with_nna = rec(2, Some("Ann"), "KNG", dec!(1));
        with_nna.nna = Some(dec!(7));
        let without = rec(2, Some("Bob"), "KNG", dec!(1));
        let selection = FilterSelection::new(vec![GroupKey::EtfOutsider], Measure::Nna);
        let result = rank(&[with_nna, without], &selection);
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn empty_selection_is_empty_result() {
        let selection =
            FilterSelection::new(vec![GroupKey::Wholesaler], Measure::Aum).for_period(p(11));
        assert!(rank(&sample(), &selection).is_empty());
    }
}
