//! Industry figures for a hand-picked list of firms.
//!
//! Names are matched case-insensitively against the initiating firm. The
//! result is a firm x category table in two shapes: one row per requested
//! firm in the order given, and only the firms that had data.

use crate::domain::filter::RecordFilter;
use crate::domain::record::{Measure, SalesRecord};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmRow {
    /// The name as typed by the user.
    pub firm: String,
    /// One cell per entry of [`FirmLookup::categories`].
    pub cells: Vec<Option<Decimal>>,
}

impl FirmRow {
    pub fn has_data(&self) -> bool {
        self.cells.iter().any(Option::is_some)
    }

    pub fn total(&self) -> Decimal {
        self.cells.iter().flatten().copied().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmLookup {
    pub measure: Measure,
    /// Category columns, sorted, uncategorised last.
    pub categories: Vec<Option<String>>,
    pub ordered: Vec<FirmRow>,
}

impl FirmLookup {
    pub fn matched(&self) -> Vec<&FirmRow> {
        self.ordered.iter().filter(|r| r.has_data()).collect()
    }

    pub fn category_labels(&self) -> Vec<&str> {
        self.categories
            .iter()
            .map(|c| c.as_deref().unwrap_or(crate::domain::record::UNKNOWN_LABEL))
            .collect()
    }
}

/// Blank names are dropped, as are repeats of a name already in the list.
fn requested_firms<S: AsRef<str>>(firms: &[S]) -> Vec<(String, String)> {
    let mut seen = BTreeSet::new();
    firms
        .iter()
        .map(|f| f.as_ref().trim())
        .filter(|f| !f.is_empty())
        .filter_map(|f| {
            let folded = f.to_lowercase();
            seen.insert(folded.clone()).then(|| (f.to_string(), folded))
        })
        .collect()
}

pub fn firm_lookup<S: AsRef<str>>(
    records: &[SalesRecord],
    firms: &[S],
    filter: &RecordFilter,
    measure: Measure,
) -> FirmLookup {
    let requested = requested_firms(firms);
    let wanted: BTreeSet<&str> = requested.iter().map(|(_, f)| f.as_str()).collect();

    let mut sums: HashMap<(String, Option<String>), Decimal> = HashMap::new();
    let mut categories: BTreeSet<Option<String>> = BTreeSet::new();

    for record in records.iter().filter(|r| filter.matches(r)) {
        let Some(firm) = record.initiating_firm.as_deref() else {
            continue;
        };
        let folded = firm.trim().to_lowercase();
        if !wanted.contains(folded.as_str()) {
            continue;
        }
        let Some(value) = record.measure(measure) else {
            continue;
        };
        categories.insert(record.category.clone());
        *sums
            .entry((folded, record.category.clone()))
            .or_insert(Decimal::ZERO) += value;
    }

    let has_unknown = categories.contains(&None);
    let mut categories: Vec<Option<String>> = categories.into_iter().flatten().map(Some).collect();
    if has_unknown {
        categories.push(None);
    }

    let ordered: Vec<FirmRow> = requested
        .into_iter()
        .map(|(firm, folded)| {
            let cells = categories
                .iter()
                .map(|c| sums.get(&(folded.clone(), c.clone())).copied())
                .collect();
            FirmRow { firm, cells }
        })
        .collect();

    log::debug!(
        "firm lookup: {} of {} requested firms have {measure} data",
        ordered.iter().filter(|r| r.has_data()).count(),
        ordered.len()
    );

    FirmLookup {
        measure,
        categories,
        ordered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::FieldFilter;
    use crate::domain::period::Period;
    use crate::domain::record::GroupKey;
    use rust_decimal_macros::dec;

    fn rec(firm: &str, category: &str, channel: &str, industry: Decimal) -> SalesRecord {
        let mut r = SalesRecord::new(Period::new(2024, 3).unwrap(), dec!(1));
        r.initiating_firm = Some(firm.to_string());
        r.category = Some(category.to_string());
        r.channel = Some(channel.to_string());
        r.industry_aum = Some(industry);
        r
    }

    fn records() -> Vec<SalesRecord> {
        vec![
            rec("ACME ADVISORS", "Buffer10", "RIA", dec!(100)),
            rec("Acme Advisors", "Buffer10", "RIA", dec!(50)),
            rec("Acme Advisors", "Crypto", "RIA", dec!(7)),
            rec("Beta Wealth", "Crypto", "RIA", dec!(20)),
            rec("Beta Wealth", "Crypto", "BD", dec!(999)),
        ]
    }

    #[test]
    fn keeps_input_order_and_casing() {
        let lookup = firm_lookup(
            &records(),
            &["beta wealth", "Nobody LLC", "acme advisors"],
            &RecordFilter::new(),
            Measure::IndustryAum,
        );
        let names: Vec<&str> = lookup.ordered.iter().map(|r| r.firm.as_str()).collect();
        assert_eq!(names, vec!["beta wealth", "Nobody LLC", "acme advisors"]);
        assert_eq!(lookup.category_labels(), vec!["Buffer10", "Crypto"]);
        assert_eq!(lookup.ordered[1].cells, vec![None, None]);
        assert_eq!(lookup.ordered[2].cells, vec![Some(dec!(150)), Some(dec!(7))]);
    }

    #[test]
    fn matched_view_skips_firms_without_data() {
        let lookup = firm_lookup(
            &records(),
            &["Nobody LLC", "Beta Wealth"],
            &RecordFilter::new(),
            Measure::IndustryAum,
        );
        let matched = lookup.matched();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].firm, "Beta Wealth");
        assert_eq!(matched[0].total(), dec!(1019));
    }

    #[test]
    fn filters_apply_before_summing() {
        let ria = RecordFilter::new().with(FieldFilter::new(GroupKey::Channel, ["RIA"]));
        let lookup = firm_lookup(&records(), &["Beta Wealth"], &ria, Measure::IndustryAum);
        assert_eq!(lookup.ordered[0].cells, vec![Some(dec!(20))]);
    }

    #[test]
    fn blank_and_duplicate_names_ignored() {
        let lookup = firm_lookup(
            &records(),
            &["Acme Advisors", "  ", "ACME advisors", ""],
            &RecordFilter::new(),
            Measure::IndustryAum,
        );
        assert_eq!(lookup.ordered.len(), 1);
        assert_eq!(lookup.ordered[0].firm, "Acme Advisors");
    }

    #[test]
    fn empty_request_gives_empty_table() {
        let none: [&str; 0] = [];
        let lookup = firm_lookup(&records(), &none, &RecordFilter::new(), Measure::IndustryAum);
        assert!(lookup.ordered.is_empty());
        assert!(lookup.categories.is_empty());
    }
}
