use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses a `Months` cell: `"3-5"`, a wrapping range such as `"11-2"`, or a comma list.
///
/// Returns `None` when the cell is blank or names no valid month.
pub fn parse_months_field(raw: &str) -> Option<BTreeSet<u32>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if !raw.contains(',') {
        if let Some((a, b)) = raw.split_once('-') {
            let a: u32 = a.trim().parse().ok()?;
            let b: u32 = b.trim().parse().ok()?;
            let months: BTreeSet<u32> = if a <= b {
                (a..=b).collect()
            } else {
                (a..=12).chain(1..=b).collect()
            };
            return non_empty(months.into_iter().filter(|m| (1..=12).contains(m)).collect());
        }
    }
    non_empty(
        raw.split(',')
            .filter_map(|tok| tok.trim().parse::<u32>().ok())
            .filter(|m| (1..=12).contains(m))
            .collect(),
    )
}

fn non_empty(months: BTreeSet<u32>) -> Option<BTreeSet<u32>> {
    (!months.is_empty()).then_some(months)
}

/// Observation month of a catalog date string, if any known layout matches.
pub fn month_from_date(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.month());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.month());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.month());
        }
    }
    // Year-month only, e.g. "2019-04".
    let (year, month) = raw.split_once('-')?;
    if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
        let month: u32 = month.get(..2).unwrap_or(month).parse().ok()?;
        return (1..=12).contains(&month).then_some(month);
    }
    None
}
