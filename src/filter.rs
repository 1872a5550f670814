use crate::indexer::FileRecord;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

/// Label of the "no subdirectory filter" choice.
pub const ALL_SUBDIRS: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubdirFilter {
    #[default]
    All,
    Named(String),
}

impl SubdirFilter {
    /// `"All"` maps to [`SubdirFilter::All`], anything else names a subdirectory.
    pub fn parse(value: &str) -> Self {
        if value == ALL_SUBDIRS {
            SubdirFilter::All
        } else {
            SubdirFilter::Named(value.to_string())
        }
    }

    fn matches(&self, record: &FileRecord) -> bool {
        match self {
            SubdirFilter::All => true,
            SubdirFilter::Named(name) => record.top_subdir == *name,
        }
    }
}

impl fmt::Display for SubdirFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubdirFilter::All => f.write_str(ALL_SUBDIRS),
            SubdirFilter::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub subdir: SubdirFilter,
    /// Inclusive lower bound on the modification date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the modification date.
    pub date_to: Option<NaiveDate>,
}

impl FilterCriteria {
    /// True when the bounds can never be satisfied.
    pub fn is_inverted(&self) -> bool {
        matches!((self.date_from, self.date_to), (Some(from), Some(to)) if from > to)
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        if !self.subdir.matches(record) {
            return false;
        }
        let day = record.modified_at.date_naive();
        self.date_from.is_none_or(|from| day >= from) && self.date_to.is_none_or(|to| day <= to)
    }
}

/// Records passing every criterion, in their original order.
///
/// Inverted date bounds (`date_from > date_to`) yield nothing.
pub fn filter(records: &[FileRecord], criteria: &FilterCriteria) -> Vec<FileRecord> {
    if criteria.is_inverted() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}

/// Choices for the subdirectory selector: `"All"` followed by every observed
/// `top_subdir`, sorted.
pub fn subdir_choices(records: &[FileRecord]) -> Vec<String> {
    let observed: BTreeSet<&str> = records.iter().map(|r| r.top_subdir.as_str()).collect();
    std::iter::once(ALL_SUBDIRS.to_string())
        .chain(observed.into_iter().map(str::to_string))
        .collect()
}

/// Oldest and newest modification dates in `records`.
pub fn date_span(records: &[FileRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let mut days = records.iter().map(|r| r.modified_at.date_naive());
    let first = days.next()?;
    Some(days.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn record(path: &str, y: i32, m: u32, d: u32) -> FileRecord {
        FileRecord::new(path, Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    fn sample() -> Vec<FileRecord> {
        vec![
            record("a/x.txt", 2024, 1, 1),
            record("b/y.txt", 2024, 6, 1),
            record("b/z.txt", 2024, 3, 15),
            record("README.md", 2023, 12, 31),
        ]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.relative_path.as_str()).collect()
    }

    #[test]
    fn test_all_without_dates_is_identity() {
        let records = sample();
        assert_eq!(filter(&records, &FilterCriteria::default()), records);
    }

    #[test]
    fn test_subdir_filter_exact_match() {
        let records = sample();
        let criteria = FilterCriteria {
            subdir: SubdirFilter::parse("a"),
            ..Default::default()
        };

        assert_eq!(paths(&filter(&records, &criteria)), vec!["a/x.txt"]);
    }

    #[test]
    fn test_union_of_subdirs_reconstructs_records() {
        let records = sample();
        let mut union = Vec::new();
        for choice in subdir_choices(&records).iter().skip(1) {
            let criteria = FilterCriteria {
                subdir: SubdirFilter::parse(choice),
                ..Default::default()
            };
            let part = filter(&records, &criteria);
            assert!(part.iter().all(|r| r.top_subdir == *choice));
            union.extend(part);
        }

        union.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        let mut expected = records.clone();
        expected.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        assert_eq!(union, expected);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let criteria = FilterCriteria {
            date_from: Some(date(2024, 6, 2)),
            date_to: Some(date(2024, 6, 1)),
            ..Default::default()
        };
        assert!(filter(&sample(), &criteria).is_empty());
        assert!(filter(&[], &criteria).is_empty());
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let criteria = FilterCriteria {
            date_from: Some(date(2024, 1, 1)),
            date_to: Some(date(2024, 3, 15)),
            ..Default::default()
        };
        assert_eq!(paths(&filter(&sample(), &criteria)), vec!["a/x.txt", "b/z.txt"]);
    }

    #[test]
    fn test_open_ended_bounds() {
        let from_only = FilterCriteria {
            date_from: Some(date(2024, 5, 1)),
            ..Default::default()
        };
        let to_only = FilterCriteria {
            date_to: Some(date(2023, 12, 31)),
            ..Default::default()
        };

        assert_eq!(paths(&filter(&sample(), &from_only)), vec!["b/y.txt"]);
        assert_eq!(paths(&filter(&sample(), &to_only)), vec!["README.md"]);
    }

    #[test]
    fn test_subdir_and_dates_compose() {
        let criteria = FilterCriteria {
            subdir: SubdirFilter::parse("b"),
            date_to: Some(date(2024, 4, 1)),
            ..Default::default()
        };
        assert_eq!(paths(&filter(&sample(), &criteria)), vec!["b/z.txt"]);
    }

    #[test]
    fn test_subdir_choices_sorted_with_all_first() {
        assert_eq!(subdir_choices(&sample()), vec!["All", "(root)", "a", "b"]);
    }

    #[test]
    fn test_date_span() {
        assert_eq!(
            date_span(&sample()),
            Some((date(2023, 12, 31), date(2024, 6, 1)))
        );
        assert_eq!(date_span(&[]), None);
    }
}
