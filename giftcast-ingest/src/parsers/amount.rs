//! Currency-formatted amounts
//!
//! Export cells look like:
//!   $1,234.56
//!   250
//!   (empty)

use regex::Regex;

use crate::error::ParseReason;

/// Strips `$` and thousands separators before numeric conversion
#[derive(Debug, Clone)]
pub struct AmountParser {
    noise: Regex,
}

impl AmountParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            noise: Regex::new(r"[\$,]")?,
        })
    }

    /// `Ok(None)` when nothing is left after stripping (missing, not zero).
    pub fn parse(&self, raw: &str) -> Result<Option<f64>, ParseReason> {
        let cleaned = self.noise.replace_all(raw, "");
        parse_number(&cleaned).map_err(|_| ParseReason::Amount)
    }
}

/// Plain numeric cell; empty is missing.
pub fn parse_number(raw: &str) -> Result<Option<f64>, ParseReason> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ParseReason::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Option<f64>, ParseReason> {
        AmountParser::new().unwrap().parse(raw)
    }

    #[test]
    fn test_currency_text() {
        assert_eq!(parse("$1,234.56"), Ok(Some(1234.56)));
        assert_eq!(parse("  $25 "), Ok(Some(25.0)));
        assert_eq!(parse("-$1,000.00"), Ok(Some(-1000.0)));
        assert_eq!(parse("1,000,000"), Ok(Some(1_000_000.0)));
    }

    #[test]
    fn test_empty_is_missing_not_zero() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("$"), Ok(None));
        assert_eq!(parse("   "), Ok(None));
        assert_eq!(parse("$0.00"), Ok(Some(0.0)));
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert_eq!(parse("twelve dollars"), Err(ParseReason::Amount));
        assert_eq!(parse("$12.3.4"), Err(ParseReason::Amount));
        assert_eq!(parse_number("inf"), Err(ParseReason::Number));
        assert_eq!(parse_number("42"), Ok(Some(42.0)));
    }
}
