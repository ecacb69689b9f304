//! Monthly aggregation: turns irregular gift events into a fixed monthly grid.

use serde::Serialize;

use crate::donation::{Channel, MonthlyBucket, Transaction};
use crate::month::{MonthRange, YearMonth};

/// Sum transaction amounts per calendar month over `range`.
///
/// The range is authoritative: every month in it gets a bucket (0 when no
/// gift landed there) and transactions outside it are ignored. Missing
/// amounts contribute 0.
pub fn aggregate_monthly<'a, I>(txns: I, range: MonthRange) -> Vec<MonthlyBucket>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut totals = vec![0.0_f64; range.len()];

    for txn in txns {
        if let Some(i) = range.offset_of(YearMonth::of(txn.date)) {
            totals[i] += txn.amount_or_zero();
        }
    }

    range
        .iter()
        .zip(totals)
        .map(|(month, total)| MonthlyBucket {
            period: month.first_day(),
            total,
        })
        .collect()
}

/// Online and offline monthly series built over the same range, so they
/// stay index-aligned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSeries {
    pub range: MonthRange,
    pub online: Vec<MonthlyBucket>,
    pub offline: Vec<MonthlyBucket>,
}

impl ChannelSeries {
    pub fn build(txns: &[Transaction], range: MonthRange) -> Self {
        let for_channel = |channel: Channel| {
            aggregate_monthly(txns.iter().filter(|t| t.channel == channel), range)
        };

        let series = Self {
            range,
            online: for_channel(Channel::Online),
            offline: for_channel(Channel::Offline),
        };

        tracing::debug!(
            months = range.len(),
            start = %range.start(),
            end = %range.end(),
            "aggregated channel series"
        );
        series
    }

    pub fn channel(&self, channel: Channel) -> &[MonthlyBucket] {
        match channel {
            Channel::Online => &self.online,
            Channel::Offline => &self.offline,
        }
    }

    /// Element-wise Online + Offline
    pub fn total(&self) -> Vec<MonthlyBucket> {
        self.online
            .iter()
            .zip(&self.offline)
            .map(|(on, off)| MonthlyBucket {
                period: on.period,
                total: on.total + off.total,
            })
            .collect()
    }
}

/// Bucket totals as a plain value vector
pub fn values(buckets: &[MonthlyBucket]) -> Vec<f64> {
    buckets.iter().map(|b| b.total).collect()
}
