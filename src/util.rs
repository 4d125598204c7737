use std::iter::repeat;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::Rng;

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(&it))
}

/// Unambiguous alphabet for join and invitation codes (no 0/O/1/I).
static CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolDay {
    pub date: NaiveDate,
    pub day_name: &'static str,
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// All Monday-Friday dates in the inclusive range, in ascending order.
///
/// Empty when `end` precedes `start` or the range only covers a weekend.
pub fn weekdays_between(start: NaiveDate, end: NaiveDate) -> Vec<SchoolDay> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        if current.weekday().number_from_monday() <= 5 {
            days.push(SchoolDay {
                date: current,
                day_name: weekday_name(current.weekday()),
            });
        }
        current += Duration::days(1);
    }
    days
}

/// [`weekdays_between`] for `YYYY-MM-DD` strings. `None` when either date
/// fails to parse.
pub fn school_days_in_range(start: &str, end: &str) -> Option<Vec<SchoolDay>> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").ok()?;
    Some(weekdays_between(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekdays_cover_monday_through_friday() {
        // 2025-01-13 is a Monday, 2025-01-19 a Sunday.
        let days = weekdays_between(date(2025, 1, 13), date(2025, 1, 19));

        assert_eq!(days.len(), 5);
        assert_eq!(days[0].date, date(2025, 1, 13));
        assert_eq!(days[0].day_name, "Monday");
        assert_eq!(days[4].date, date(2025, 1, 17));
        assert_eq!(days[4].day_name, "Friday");

        for pair in days.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }

    #[test]
    fn weekdays_empty_for_inverted_range() {
        assert!(weekdays_between(date(2025, 1, 19), date(2025, 1, 13)).is_empty());
    }

    #[test]
    fn weekdays_empty_for_weekend_only_range() {
        // Saturday and Sunday only.
        assert!(weekdays_between(date(2025, 1, 18), date(2025, 1, 19)).is_empty());
    }

    #[test]
    fn weekdays_single_day_range() {
        let days = weekdays_between(date(2025, 1, 15), date(2025, 1, 15));
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].day_name, "Wednesday");
    }

    #[test]
    fn weekdays_span_across_weekend() {
        // Friday through Tuesday skips Saturday and Sunday.
        let days = weekdays_between(date(2025, 1, 17), date(2025, 1, 21));
        let names: Vec<_> = days.iter().map(|d| d.day_name).collect();
        assert_eq!(names, vec!["Friday", "Monday", "Tuesday"]);
    }

    #[test]
    fn school_days_parse_iso_dates() {
        let days = school_days_in_range("2025-01-13", "2025-01-17").unwrap();
        assert_eq!(days.len(), 5);
        assert!(school_days_in_range("01/13/2025", "2025-01-17").is_none());
    }

    #[test]
    fn generated_codes_use_expected_alphabet() {
        for _ in 0..32 {
            let code = generate_code(8);
            assert_eq!(code.len(), 8);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }
}
