//! Calendar-month arithmetic: the fixed grid that gift events are bucketed onto.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::RangeError;

/// A calendar month, e.g. 2017-07
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, RangeError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(RangeError::InvalidMonth(format!("{year}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// The month a date falls in (day-of-month ignored)
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn succ(&self) -> Self {
        self.add_months(1)
    }

    /// Shift by `n` months (may be negative)
    pub fn add_months(&self, n: i64) -> Self {
        let index = self.index() + n;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Months elapsed since year 0, January
    fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        // Constructed through `new` or `of`, so day 1 always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = RangeError;

    /// Accepts "2017-07" or a full date "2017-07-01"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || RangeError::InvalidMonth(s.to_string());

        let mut parts = s.split('-');
        let year: i32 = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        let month: u32 = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        if let Some(day) = parts.next() {
            let day: u32 = day.parse().map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        YearMonth::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = RangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Inclusive span of calendar months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRange {
    start: YearMonth,
    end: YearMonth,
}

impl MonthRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self, RangeError> {
        if end < start {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// July of `end_year - 1` through June of `end_year`
    pub fn fiscal_year(end_year: i32) -> Self {
        Self {
            start: YearMonth { year: end_year - 1, month: 7 },
            end: YearMonth { year: end_year, month: 6 },
        }
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn end(&self) -> YearMonth {
        self.end
    }

    /// Number of calendar months in the range (never zero)
    pub fn len(&self) -> usize {
        (self.end.index() - self.start.index() + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.start <= month && month <= self.end
    }

    /// Position of `month` on the grid, if it falls inside
    pub fn offset_of(&self, month: YearMonth) -> Option<usize> {
        self.contains(month)
            .then(|| (month.index() - self.start.index()) as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = YearMonth> + use<> {
        let start = self.start;
        (0..self.len() as i64).map(move |i| start.add_months(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_fiscal_year_span() {
        let fy = MonthRange::fiscal_year(2018);
        assert_eq!(fy.start(), ym("2017-07"));
        assert_eq!(fy.end(), ym("2018-06"));
        assert_eq!(fy.len(), 12);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(ym("2017-07").to_string(), "2017-07");
        assert_eq!(ym("2024-06-30"), ym("2024-06"));
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("2024-02-30".parse::<YearMonth>().is_err());
        assert!("June 2024".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_succ_wraps_year() {
        assert_eq!(ym("2023-12").succ(), ym("2024-01"));
        assert_eq!(ym("2024-01").add_months(-1), ym("2023-12"));
        assert_eq!(ym("2024-06").add_months(12), ym("2025-06"));
    }

    #[test]
    fn test_range_len_matches_dashboard_window() {
        let range = MonthRange::new(ym("2017-07"), ym("2024-06")).unwrap();
        assert_eq!(range.len(), 84);
        assert_eq!(range.iter().count(), 84);
        assert_eq!(range.iter().last(), Some(ym("2024-06")));
    }

    #[test]
    fn test_range_rejects_inverted() {
        let err = MonthRange::new(ym("2024-06"), ym("2024-05")).unwrap_err();
        assert!(matches!(err, RangeError::Inverted { .. }));
        // single month is fine
        assert_eq!(MonthRange::new(ym("2024-06"), ym("2024-06")).unwrap().len(), 1);
    }

    #[test]
    fn test_offset_of() {
        let range = MonthRange::new(ym("2017-07"), ym("2018-06")).unwrap();
        assert_eq!(range.offset_of(ym("2017-07")), Some(0));
        assert_eq!(range.offset_of(ym("2018-01")), Some(6));
        assert_eq!(range.offset_of(ym("2018-07")), None);
        assert_eq!(range.offset_of(ym("2017-06")), None);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&ym("2019-03")).unwrap();
        assert_eq!(json, "\"2019-03\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ym("2019-03"));
    }
}
