use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::cmp::Ordering;

/// A parsed calendar date that compares after every valid date when invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateKey(Option<NaiveDate>);

impl DateKey {
    pub const INVALID: DateKey = DateKey(None);

    pub fn valid(date: NaiveDate) -> Self {
        Self(Some(date))
    }

    pub fn date(self) -> Option<NaiveDate> {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0.is_some()
    }
}

impl PartialOrd for DateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

const MONTH_NAMES: &[(&str, u32)] = &[
    ("januari", 1),
    ("january", 1),
    ("jan", 1),
    ("februari", 2),
    ("february", 2),
    ("feb", 2),
    ("maart", 3),
    ("march", 3),
    ("mrt", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("mei", 5),
    ("may", 5),
    ("juni", 6),
    ("june", 6),
    ("jun", 6),
    ("juli", 7),
    ("july", 7),
    ("jul", 7),
    ("augustus", 8),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("oktober", 10),
    ("october", 10),
    ("okt", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%B %d, %Y"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses an admin-entered date. Numeric day-first wins over month names,
/// and both win over the generic fallback formats.
pub fn parse_date(raw: &str) -> DateKey {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DateKey::INVALID;
    }
    parse_day_month_year(trimmed)
        .or_else(|| parse_named_month(trimmed))
        .or_else(|| parse_fallback_date(trimmed))
        .map(DateKey::valid)
        .unwrap_or(DateKey::INVALID)
}

/// Parses a wall-clock time such as `18:00`, `18:00:30` or `18.00`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    ["%H:%M", "%H:%M:%S", "%H.%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
}

/// Combines a performance date cell and time cell into local wall-clock time.
pub fn performance_start(date: &str, time: &str) -> Option<NaiveDateTime> {
    let day = parse_date(date).date()?;
    let at = parse_time(time)?;
    Some(day.and_time(at))
}

/// Parses a full date-time (curated feed entries). Offsets are converted to
/// local wall-clock time; a bare date resolves to local midnight.
pub fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.with_timezone(&Local).naive_local());
    }
    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
    {
        return Some(naive);
    }
    parse_date(trimmed)
        .date()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
}

fn parse_day_month_year(input: &str) -> Option<NaiveDate> {
    let mut parts = input.split('-');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || year.trim().len() != 4 {
        return None;
    }
    let day: u32 = day.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_named_month(input: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };
    let day: u32 = day.trim_end_matches('.').parse().ok()?;
    let month_key = month.trim_end_matches(['.', ',']).to_lowercase();
    let month = MONTH_NAMES
        .iter()
        .find(|(name, _)| *name == month_key)
        .map(|(_, number)| *number)?;
    let year: i32 = year.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_fallback_date(input: &str) -> Option<NaiveDate> {
    if let Some(date) = FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
    {
        return Some(date);
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(input) {
        return Some(with_offset.with_timezone(&Local).date_naive());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .map(|naive| naive.date())
}
