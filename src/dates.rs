//! Natural-language date parsing for calendar extraction.
//!
//! Supported, in priority order:
//! - "today", "tomorrow"
//! - "next <weekday>" (never resolves to `today`; same weekday means +7 days)
//! - numeric `D/M[/Y]` with `/`, `-` or `.` separators; two-digit years pivot at 50
//! - whole-text standard formats: `MM/dd/yyyy`, `MM-dd-yyyy`, `yyyy-MM-dd`, `dd MMM yyyy`

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Weekday};
use regex::Regex;

lazy_static::lazy_static! {
    static ref TODAY: Regex = Regex::new(r"(?i)today").unwrap();
    static ref TOMORROW: Regex = Regex::new(r"(?i)tomorrow").unwrap();
    static ref NEXT_WEEKDAY: Regex = Regex::new(
        r"(?i)next (monday|tuesday|wednesday|thursday|friday|saturday|sunday)"
    ).unwrap();
    // Must not start inside a longer number or date (e.g. the "05-06" of "2024-05-06")
    static ref NUMERIC: Regex = Regex::new(
        r"(?:^|[^\d/.\-])(\d{1,2})[/.\-](\d{1,2})(?:[/.\-](\d{2,4}))?"
    ).unwrap();
}

const STANDARD_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d", "%d %b %Y"];

/// Resolve a date phrase relative to `today`. Returns `None` when nothing parses.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if TODAY.is_match(text) {
        return Some(today);
    }

    if TOMORROW.is_match(text) {
        return today.checked_add_signed(Duration::days(1));
    }

    if let Some(caps) = NEXT_WEEKDAY.captures(text) {
        let target = weekday_from_name(&caps[1])?;
        return Some(next_weekday(today, target));
    }

    if let Some(caps) = NUMERIC.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = match caps.get(3) {
            Some(y) => expand_year(y.as_str().parse().ok()?),
            None => today.year(),
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
        tracing::debug!(text, "Numeric date out of range, trying standard formats");
    }

    let trimmed = text.trim();
    STANDARD_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Days until the next occurrence of `target`, in 1..=7.
pub fn next_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let current = today.weekday().num_days_from_sunday() as i64;
    let wanted = target.num_days_from_sunday() as i64;
    let mut delta = (wanted + 7 - current) % 7;
    if delta == 0 {
        delta = 7;
    }
    today + Duration::days(delta)
}

/// Source of "now" for date-relative handlers.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always reports the same instant. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl FixedClock {
    /// Noon local time on `date`.
    pub fn on(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        let instant = Local
            .from_local_datetime(&noon)
            .earliest()
            .unwrap_or_else(Local::now);
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

fn expand_year(year: i32) -> i32 {
    if year < 100 {
        if year < 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name.to_lowercase().as_str() {
        "sunday" => Some(Weekday::Sun),
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        _ => None,
    }
}
