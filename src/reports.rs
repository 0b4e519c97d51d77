// 📊 Reporting Transforms - aggregates behind the table view and the charts
//
// Pure functions over the in-memory tables. Grouped counts are returned as
// ordered (key, count) pairs so callers can render them directly as bars.

use crate::error::RecordResult;
use crate::records::{CalfRecord, TableRecord, TreatmentRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Filter sentinel meaning "every property"
pub const ALL_PROPERTIES: &str = "Todas";

/// Ordered (key, count) pairs
pub type Tally<K> = Vec<(K, usize)>;

/// Count per key, keys in first-seen order
fn tally<K, I>(keys: I) -> Tally<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Tally<K> = Vec::new();

    for key in keys {
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    counts
}

/// Descending by count; stable sort keeps first-seen order on ties
fn ranked<K>(mut counts: Tally<K>) -> Tally<K> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

// ============================================================================
// GROUPED COUNTS
// ============================================================================

pub fn count_by_property(records: &[TreatmentRecord]) -> Tally<String> {
    tally(records.iter().map(|r| r.property.clone()))
}

pub fn count_by_reason(records: &[TreatmentRecord]) -> Tally<String> {
    ranked(tally(records.iter().map(|r| r.reason.clone())))
}

pub fn count_by_responsible(records: &[TreatmentRecord]) -> Tally<String> {
    ranked(tally(records.iter().map(|r| r.responsible.clone())))
}

pub fn count_by_dose_count(records: &[TreatmentRecord]) -> Tally<u32> {
    ranked(tally(records.iter().map(|r| r.dose_count)))
}

/// Treatments per calendar day of the first dose, ascending by date.
///
/// Every date is parsed before counting: one unparsable value fails the
/// whole series instead of dropping that row.
pub fn treatments_over_time(records: &[TreatmentRecord]) -> RecordResult<Vec<(NaiveDate, usize)>> {
    let days = records
        .iter()
        .map(TreatmentRecord::first_dose_day)
        .collect::<RecordResult<Vec<_>>>()?;

    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for day in days {
        *buckets.entry(day).or_insert(0) += 1;
    }

    Ok(buckets.into_iter().collect())
}

// ============================================================================
// FILTERS & SELECTOR OPTIONS
// ============================================================================

pub fn is_all_properties(property: &str) -> bool {
    property == ALL_PROPERTIES || property == "All"
}

/// Equality filter on `Propriedade`; "Todas"/"All" returns everything
pub fn filter_by_property<T: TableRecord>(records: &[T], property: &str) -> Vec<T> {
    if is_all_properties(property) {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|r| r.property() == property)
        .cloned()
        .collect()
}

/// "Todas" followed by each distinct property in first-seen order
pub fn property_options<T: TableRecord>(records: &[T]) -> Vec<String> {
    let mut options = vec![ALL_PROPERTIES.to_string()];
    options.extend(tally(records.iter().map(|r| r.property())).into_iter().map(|(p, _)| p.to_string()));
    options
}

/// Distinct ear tags of the registry, first-seen order
pub fn ear_tag_options(registry: &[CalfRecord]) -> Vec<String> {
    tally(registry.iter().map(|c| c.ear_tag.as_str()))
        .into_iter()
        .map(|(tag, _)| tag.to_string())
        .collect()
}

// ============================================================================
// CHART PAGE
// ============================================================================

/// Everything the charts page draws, computed in one pass over the log
#[derive(Debug, Clone, Serialize)]
pub struct ChartSummary {
    pub by_property: Tally<String>,
    pub by_reason: Tally<String>,
    pub by_responsible: Tally<String>,
    pub by_dose_count: Tally<u32>,
    pub over_time: Vec<(NaiveDate, usize)>,
    /// Set when the time series could not be built; the counts are still valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over_time_error: Option<String>,
}

impl ChartSummary {
    pub fn from_treatments(records: &[TreatmentRecord]) -> Self {
        let (over_time, over_time_error) = match treatments_over_time(records) {
            Ok(series) => (series, None),
            Err(err) => (Vec::new(), Some(err.to_string())),
        };

        ChartSummary {
            by_property: count_by_property(records),
            by_reason: count_by_reason(records),
            by_responsible: count_by_responsible(records),
            by_dose_count: count_by_dose_count(records),
            over_time,
            over_time_error,
        }
    }

    pub fn total_treatments(&self) -> usize {
        self.by_property.iter().map(|(_, n)| n).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn treatment(property: &str, reason: &str, date: NaiveDate) -> TreatmentRecord {
        TreatmentRecord::new(property, "001", reason, date)
    }

    #[test]
    fn test_count_by_property_first_seen_order() {
        let records = vec![
            treatment("B", "x", day(2023, 1, 1)),
            treatment("A", "x", day(2023, 1, 1)),
            treatment("A", "x", day(2023, 1, 1)),
        ];

        assert_eq!(
            count_by_property(&records),
            vec![("B".to_string(), 1), ("A".to_string(), 2)]
        );
    }

    #[test]
    fn test_count_by_property_groups() {
        let records = vec![
            treatment("A", "x", day(2023, 1, 1)),
            treatment("A", "x", day(2023, 1, 1)),
            treatment("B", "x", day(2023, 1, 1)),
        ];

        assert_eq!(
            count_by_property(&records),
            vec![("A".to_string(), 2), ("B".to_string(), 1)]
        );
    }

    #[test]
    fn test_count_by_reason_descending() {
        let records = vec![
            treatment("A", "cold", day(2023, 1, 1)),
            treatment("A", "fever", day(2023, 1, 1)),
            treatment("A", "fever", day(2023, 1, 1)),
        ];

        assert_eq!(
            count_by_reason(&records),
            vec![("fever".to_string(), 2), ("cold".to_string(), 1)]
        );
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let records = vec![
            treatment("A", "x", day(2023, 1, 1)).with_responsible("Maria"),
            treatment("A", "x", day(2023, 1, 1)).with_responsible("João"),
            treatment("A", "x", day(2023, 1, 1)).with_responsible("Ana"),
            treatment("A", "x", day(2023, 1, 1)).with_responsible("Ana"),
        ];

        let names: Vec<_> = count_by_responsible(&records)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["Ana", "Maria", "João"]);
    }

    #[test]
    fn test_count_by_dose_count() {
        let records = vec![
            treatment("A", "x", day(2023, 1, 1)).with_dose_count(1),
            treatment("A", "x", day(2023, 1, 1)).with_dose_count(3),
            treatment("A", "x", day(2023, 1, 1)).with_dose_count(3),
        ];

        assert_eq!(count_by_dose_count(&records), vec![(3, 2), (1, 1)]);
    }

    #[test]
    fn test_treatments_over_time_buckets_by_day() {
        let records = vec![
            treatment("A", "x", day(2023, 2, 1)),
            treatment("A", "x", day(2023, 1, 15)),
            treatment("B", "y", day(2023, 1, 15)),
        ];

        assert_eq!(
            treatments_over_time(&records).unwrap(),
            vec![(day(2023, 1, 15), 2), (day(2023, 2, 1), 1)]
        );
    }

    #[test]
    fn test_treatments_over_time_fails_on_bad_date() {
        let mut bad = treatment("A", "x", day(2023, 1, 1));
        bad.first_dose_date = "not-a-date".to_string();
        let records = vec![treatment("A", "x", day(2023, 1, 2)), bad];

        let err = treatments_over_time(&records).unwrap_err();
        assert!(matches!(err, RecordError::Parse { ref value, .. } if value == "not-a-date"));
    }

    #[test]
    fn test_empty_log_gives_empty_reports() {
        assert!(count_by_property(&[]).is_empty());
        assert!(count_by_reason(&[]).is_empty());
        assert!(treatments_over_time(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_filter_identity_for_sentinels() {
        let records = vec![
            treatment("A", "x", day(2023, 1, 1)),
            treatment("B", "x", day(2023, 1, 1)),
        ];

        assert_eq!(filter_by_property(&records, "Todas"), records);
        assert_eq!(filter_by_property(&records, "All"), records);
    }

    #[test]
    fn test_sentinel_match_is_exact() {
        let records = vec![
            treatment("all", "x", day(2023, 1, 1)),
            treatment("B", "y", day(2023, 1, 1)),
            treatment("TODAS", "z", day(2023, 1, 1)),
        ];

        let filtered = filter_by_property(&records, "all");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].reason, "x");

        assert_eq!(filter_by_property(&records, "TODAS").len(), 1);
        assert!(!is_all_properties("ALL"));
    }

    #[test]
    fn test_filter_by_property_equality() {
        let records = vec![
            treatment("A", "x", day(2023, 1, 1)),
            treatment("B", "y", day(2023, 1, 1)),
            treatment("A", "z", day(2023, 1, 1)),
        ];

        let filtered = filter_by_property(&records, "A");
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.property == "A"));
        assert!(filter_by_property(&records, "C").is_empty());
    }

    #[test]
    fn test_options() {
        let calves = vec![
            CalfRecord::new("Sítio", "010", day(2023, 1, 1)),
            CalfRecord::new("Fazenda", "011", day(2023, 1, 1)),
            CalfRecord::new("Sítio", "010", day(2023, 1, 1)),
        ];

        assert_eq!(property_options(&calves), vec!["Todas", "Sítio", "Fazenda"]);
        assert_eq!(ear_tag_options(&calves), vec!["010", "011"]);
    }

    #[test]
    fn test_chart_summary_survives_bad_date() {
        let mut bad = treatment("A", "fever", day(2023, 1, 1));
        bad.first_dose_date = "31/02/2023".to_string();
        let records = vec![treatment("A", "fever", day(2023, 1, 2)), bad];

        let summary = ChartSummary::from_treatments(&records);

        assert_eq!(summary.total_treatments(), 2);
        assert_eq!(summary.by_reason, vec![("fever".to_string(), 2)]);
        assert!(summary.over_time.is_empty());
        assert!(summary.over_time_error.is_some());
    }
}
