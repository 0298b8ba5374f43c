//! Display helpers for values returned by the API.

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Formats a 10–100 rating on the familiar 1–10 scale.
///
/// ```
/// use vndb_kana::format::format_rating;
///
/// assert_eq!(format_rating(Some(85.2)), "8.52");
/// assert_eq!(format_rating(None), "N/A");
/// ```
pub fn format_rating(raw: Option<f64>) -> String {
    match raw {
        Some(rating) if rating.is_finite() && rating > 0.0 => format!("{:.2}", rating / 10.0),
        _ => "N/A".to_string(),
    }
}

/// Formats a count with comma thousands separators.
pub fn format_votes(votes: u64) -> String {
    let digits = votes.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats a play time in minutes as hours and minutes, e.g. `"12h 30m"`.
pub fn format_length(minutes: u32) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Label for the 1–5 `length` code of a visual novel.
pub fn length_category(code: u8) -> Option<&'static str> {
    match code {
        1 => Some("Very short (< 2 hours)"),
        2 => Some("Short (2 - 10 hours)"),
        3 => Some("Medium (10 - 30 hours)"),
        4 => Some("Long (30 - 50 hours)"),
        5 => Some("Very long (> 50 hours)"),
        _ => None,
    }
}

/// Splits an id such as `"v17"` into its type prefix and number.
///
/// ```
/// use vndb_kana::format::parse_id;
///
/// assert_eq!(parse_id("v17").unwrap(), ('v', 17));
/// assert!(parse_id("17").is_err());
/// ```
///
/// # Errors
///
/// Returns [`Error::Validation`] unless the id is one lowercase letter
/// followed by decimal digits.
pub fn parse_id(id: &str) -> Result<(char, u64)> {
    let mut chars = id.chars();
    let prefix = match chars.next() {
        Some(c) if c.is_ascii_lowercase() => c,
        _ => return Err(Error::validation(format!("malformed id '{}'", id))),
    };
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::validation(format!("malformed id '{}'", id)));
    }
    let number = digits
        .parse()
        .map_err(|_| Error::validation(format!("id '{}' is out of range", id)))?;
    Ok((prefix, number))
}

/// A release date as the API reports it, possibly only partly known.
///
/// Dates sort chronologically. A date known only to the month or year sorts
/// after the precise dates within that month or year, `Unknown` sorts first
/// and `Tba` last.
///
/// ```
/// use vndb_kana::format::ReleaseDate;
///
/// let date: ReleaseDate = "2019-04".parse().unwrap();
/// assert_eq!(date.to_string(), "April 2019");
/// assert!(date < "TBA".parse().unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReleaseDate {
    /// No date is known (`"unknown"`).
    Unknown,
    /// Only the year is known, e.g. `"2019"`.
    Year(i32),
    /// Year and month are known, e.g. `"2019-04"`. Stored as the first day of
    /// the month.
    Month(NaiveDate),
    /// The exact day is known, e.g. `"2019-04-15"`.
    Day(NaiveDate),
    /// Announced but not yet dated (`"TBA"`).
    Tba,
}

impl ReleaseDate {
    /// The year, when at least that much is known.
    pub fn year(&self) -> Option<i32> {
        match self {
            ReleaseDate::Year(year) => Some(*year),
            ReleaseDate::Month(date) | ReleaseDate::Day(date) => Some(date.year()),
            ReleaseDate::Unknown | ReleaseDate::Tba => None,
        }
    }

    /// The full date, when the day is known.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            ReleaseDate::Day(date) => Some(*date),
            _ => None,
        }
    }

    /// Whether the release has happened by `today`. Partial dates count as
    /// released once their whole span has passed.
    pub fn is_released_by(&self, today: NaiveDate) -> bool {
        match self {
            ReleaseDate::Day(date) => *date <= today,
            ReleaseDate::Month(date) => {
                (date.year(), date.month()) < (today.year(), today.month())
            }
            ReleaseDate::Year(year) => *year < today.year(),
            ReleaseDate::Unknown | ReleaseDate::Tba => false,
        }
    }

    fn sort_key(&self) -> i64 {
        match self {
            ReleaseDate::Unknown => i64::MIN,
            ReleaseDate::Year(year) => i64::from(*year) * 10_000 + 9_999,
            ReleaseDate::Month(date) => {
                i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + 99
            }
            ReleaseDate::Day(date) => {
                i64::from(date.year()) * 10_000
                    + i64::from(date.month()) * 100
                    + i64::from(date.day())
            }
            ReleaseDate::Tba => i64::MAX,
        }
    }

    fn to_api_string(self) -> String {
        match self {
            ReleaseDate::Unknown => "unknown".to_string(),
            ReleaseDate::Year(year) => format!("{:04}", year),
            ReleaseDate::Month(date) => date.format("%Y-%m").to_string(),
            ReleaseDate::Day(date) => date.format("%Y-%m-%d").to_string(),
            ReleaseDate::Tba => "TBA".to_string(),
        }
    }
}

impl FromStr for ReleaseDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("invalid release date '{}'", s));
        let s = s.trim();
        if s.eq_ignore_ascii_case("tba") {
            return Ok(ReleaseDate::Tba);
        }
        if s.eq_ignore_ascii_case("unknown") {
            return Ok(ReleaseDate::Unknown);
        }

        let parts: Vec<&str> = s.split('-').collect();
        let widths_ok = match parts.as_slice() {
            [y] => y.len() == 4,
            [y, m] => y.len() == 4 && m.len() == 2,
            [y, m, d] => y.len() == 4 && m.len() == 2 && d.len() == 2,
            _ => false,
        };
        if !widths_ok || !parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())) {
            return Err(invalid());
        }

        let year: i32 = parts[0].parse().map_err(|_| invalid())?;
        match parts.len() {
            1 => Ok(ReleaseDate::Year(year)),
            2 => {
                let month = parts[1].parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, month, 1)
                    .map(ReleaseDate::Month)
                    .ok_or_else(invalid)
            }
            _ => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(ReleaseDate::Day)
                .map_err(|_| invalid()),
        }
    }
}

impl TryFrom<String> for ReleaseDate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ReleaseDate> for String {
    fn from(date: ReleaseDate) -> Self {
        date.to_api_string()
    }
}

impl fmt::Display for ReleaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseDate::Unknown => f.write_str("Unknown"),
            ReleaseDate::Tba => f.write_str("TBA"),
            ReleaseDate::Year(year) => write!(f, "{}", year),
            ReleaseDate::Month(date) => write!(f, "{}", date.format("%B %Y")),
            ReleaseDate::Day(date) => write!(f, "{}", date.format("%B %-d, %Y")),
        }
    }
}

impl Ord for ReleaseDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for ReleaseDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> ReleaseDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_format_rating() {
        assert_eq!(format_rating(Some(85.2)), "8.52");
        assert_eq!(format_rating(Some(100.0)), "10.00");
        assert_eq!(format_rating(Some(0.0)), "N/A");
        assert_eq!(format_rating(Some(f64::NAN)), "N/A");
        assert_eq!(format_rating(None), "N/A");
    }

    #[test]
    fn test_format_votes() {
        assert_eq!(format_votes(0), "0");
        assert_eq!(format_votes(999), "999");
        assert_eq!(format_votes(12_345), "12,345");
        assert_eq!(format_votes(1_000_000), "1,000,000");
    }

    #[test]
    fn test_format_length() {
        assert_eq!(format_length(750), "12h 30m");
        assert_eq!(format_length(45), "45m");
        assert_eq!(format_length(180), "3h");
        assert_eq!(format_length(0), "0m");
    }

    #[test]
    fn test_length_category() {
        assert_eq!(length_category(1), Some("Very short (< 2 hours)"));
        assert_eq!(length_category(5), Some("Very long (> 50 hours)"));
        assert_eq!(length_category(0), None);
        assert_eq!(length_category(6), None);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("v17").unwrap(), ('v', 17));
        assert_eq!(parse_id("r123456").unwrap(), ('r', 123456));
        for bad in ["", "v", "17", "V17", "v-1", "v1x", "vv1", "v99999999999999999999999"] {
            assert!(
                matches!(parse_id(bad), Err(Error::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_release_date_display() {
        assert_eq!(date("2019-04-15").to_string(), "April 15, 2019");
        assert_eq!(date("2019-04-05").to_string(), "April 5, 2019");
        assert_eq!(date("2019-04").to_string(), "April 2019");
        assert_eq!(date("2019").to_string(), "2019");
        assert_eq!(date("TBA").to_string(), "TBA");
        assert_eq!(date("unknown").to_string(), "Unknown");
    }

    #[test]
    fn test_release_date_rejects_garbage() {
        for bad in ["", "2019-13", "2019-02-30", "19-04-15", "2019/04/15", "2019-4", "soon"] {
            assert!(bad.parse::<ReleaseDate>().is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_release_date_ordering() {
        let mut dates = vec![
            date("TBA"),
            date("2019"),
            date("2019-04"),
            date("2020-01-01"),
            date("2019-04-15"),
            date("unknown"),
            date("2018-12-31"),
        ];
        dates.sort();
        let sorted: Vec<String> = dates.into_iter().map(String::from).collect();
        assert_eq!(
            sorted,
            vec!["unknown", "2018-12-31", "2019-04-15", "2019-04", "2019", "2020-01-01", "TBA"]
        );
    }

    #[test]
    fn test_release_date_serde() {
        let parsed: Vec<Option<ReleaseDate>> =
            serde_json::from_str(r#"["2019-04-15", "TBA", null]"#).unwrap();
        assert_eq!(parsed, vec![Some(date("2019-04-15")), Some(ReleaseDate::Tba), None]);
        assert_eq!(serde_json::to_string(&date("2019-04")).unwrap(), r#""2019-04""#);
        assert!(serde_json::from_str::<ReleaseDate>(r#""2019-99""#).is_err());
    }

    #[test]
    fn test_is_released_by() {
        let today = NaiveDate::from_ymd_opt(2019, 4, 20).unwrap();
        assert!(date("2019-04-15").is_released_by(today));
        assert!(!date("2019-04").is_released_by(today));
        assert!(date("2019-03").is_released_by(today));
        assert!(!date("2019").is_released_by(today));
        assert!(!ReleaseDate::Tba.is_released_by(today));
        assert_eq!(date("2019-04").year(), Some(2019));
        assert_eq!(date("2019-04").date(), None);
    }
}
