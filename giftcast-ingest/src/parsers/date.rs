//! Gift date cells
//!
//! Accepted shapes (an optional time-of-day part is allowed and dropped):
//!   2024-06-30          2024/06/30
//!   6/30/2024           06/30/24
//!   30-Jun-2024         30-Jun-24
//!   Jun 30, 2024        2024-06-30 14:05:00
//!   2024-06-30T14:05:00 6/30/2024 2:05 PM
//!   2024-06-30T14:05:00Z (RFC 3339; the date as written, offset ignored)

use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;

/// Shape-checked date formats; the shape regex guards against `%Y`
/// swallowing two-digit years.
#[derive(Debug, Clone)]
pub struct DateParser {
    shapes: Vec<(Regex, &'static str)>,
    /// Shapes containing spaces, matched against the whole cell
    spelled: Vec<(Regex, &'static str)>,
}

const TIME_FORMATS: [&str; 5] = ["%H:%M:%S", "%H:%M", "%H:%M:%S%.f", "%I:%M:%S %p", "%I:%M %p"];

impl DateParser {
    pub fn new() -> Result<Self, regex::Error> {
        let shapes = vec![
            (Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$")?, "%Y-%m-%d"),
            (Regex::new(r"^\d{4}/\d{1,2}/\d{1,2}$")?, "%Y/%m/%d"),
            (Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$")?, "%m/%d/%Y"),
            (Regex::new(r"^\d{1,2}/\d{1,2}/\d{2}$")?, "%m/%d/%y"),
            (Regex::new(r"^\d{1,2}-[A-Za-z]{3}-\d{4}$")?, "%d-%b-%Y"),
            (Regex::new(r"^\d{1,2}-[A-Za-z]{3}-\d{2}$")?, "%d-%b-%y"),
        ];
        let spelled = vec![(Regex::new(r"^[A-Za-z]{3} \d{1,2}, \d{4}$")?, "%b %d, %Y")];
        Ok(Self { shapes, spelled })
    }

    /// Calendar date of a cell, or `None` if it is empty or unparseable.
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        if let Some((_, fmt)) = self.spelled.iter().find(|(re, _)| re.is_match(s)) {
            return NaiveDate::parse_from_str(s, fmt).ok();
        }
        if let Ok(stamp) = DateTime::parse_from_rfc3339(s) {
            return Some(stamp.date_naive());
        }
        let (date_part, time_part) = match s.split_once(char::is_whitespace) {
            Some((date, time)) => (date, time.trim()),
            None => match s.split_once('T') {
                Some((date, time)) if date.bytes().all(|b| b.is_ascii_digit() || b == b'-') => {
                    (date, time)
                }
                _ => (s, ""),
            },
        };
        if date_part.is_empty() {
            return None;
        }
        if !time_part.is_empty()
            && !TIME_FORMATS
                .iter()
                .any(|fmt| NaiveTime::parse_from_str(time_part, fmt).is_ok())
        {
            return None;
        }

        let (_, fmt) = self.shapes.iter().find(|(re, _)| re.is_match(date_part))?;
        NaiveDate::parse_from_str(date_part, fmt).ok()
    }
}
