//! Headline channel totals shown above the dashboard charts.

use giftcast_core::{Channel, Transaction};
use serde::Serialize;

use crate::breakdown;

/// Summed gift amounts per channel over every loaded transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total_online: f64,
    pub total_offline: f64,
}

impl KeyMetrics {
    /// Missing amounts are skipped.
    pub fn from_transactions(txns: &[Transaction]) -> Self {
        let mut metrics = KeyMetrics::default();
        for (channel, total) in breakdown::transaction_amounts(txns) {
            match channel {
                Channel::Online => metrics.total_online = total,
                Channel::Offline => metrics.total_offline = total,
            }
        }
        metrics
    }

    pub fn total(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Online => self.total_online,
            Channel::Offline => self.total_offline,
        }
    }

    /// `(label, formatted amount)` rows, online first
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Online Donations", format_usd(self.total_online)),
            ("Total Offline Donations", format_usd(self.total_offline)),
        ]
    }
}

/// Dollar amount with comma-grouped thousands and two decimals,
/// e.g. `$66,061.70` or `-$1,200.00`.
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(999.5), "$999.50");
        assert_eq!(format_usd(1000.0), "$1,000.00");
        assert_eq!(format_usd(66061.7), "$66,061.70");
        assert_eq!(format_usd(1234567.891), "$1,234,567.89");
        assert_eq!(format_usd(-1200.0), "-$1,200.00");
        assert_eq!(format_usd(-0.001), "$0.00");
    }

    #[test]
    fn test_totals_skip_missing_amounts() {
        let day = NaiveDate::from_ymd_opt(2021, 5, 2).unwrap();
        let txns = vec![
            Transaction::new(day, Some(1500.25), Channel::Online),
            Transaction::new(day, None, Channel::Online),
            Transaction::new(day, Some(10.0), Channel::Offline),
            Transaction::new(day, Some(2.5), Channel::Offline),
        ];
        let metrics = KeyMetrics::from_transactions(&txns);
        assert_eq!(metrics.total(Channel::Online), 1500.25);
        assert_eq!(metrics.total(Channel::Offline), 12.5);
        assert_eq!(
            metrics.rows(),
            vec![
                ("Total Online Donations", "$1,500.25".to_string()),
                ("Total Offline Donations", "$12.50".to_string()),
            ]
        );
    }
}
