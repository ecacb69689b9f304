//! Categorical aggregates over the donor table: counts, sums, shares and
//! per-group means that feed the breakdown charts.
//!
//! Rows without a known channel are left out of every channel split, and
//! rows whose age falls outside the generation bins are left out of every
//! generation split.

use std::collections::{BTreeMap, HashMap};

use giftcast_core::{Channel, DonorRecord, FiscalYear, FrequencyBin, Generation, Transaction};

/// Gift rows per channel, in `Channel::ALL` order
pub fn channel_counts(donors: &[DonorRecord]) -> Vec<(Channel, usize)> {
    Channel::ALL
        .iter()
        .map(|c| (*c, donors.iter().filter(|d| d.is_channel(*c)).count()))
        .collect()
}

/// Summed amounts per channel; missing amounts are skipped
pub fn channel_amounts(donors: &[DonorRecord]) -> Vec<(Channel, f64)> {
    Channel::ALL
        .iter()
        .map(|c| {
            let total = donors
                .iter()
                .filter(|d| d.is_channel(*c))
                .filter_map(|d| d.fund_split_amount)
                .sum();
            (*c, total)
        })
        .collect()
}

/// Summed transaction amounts per channel, in `Channel::ALL` order
pub fn transaction_amounts(txns: &[Transaction]) -> Vec<(Channel, f64)> {
    Channel::ALL
        .iter()
        .map(|c| {
            let total = txns
                .iter()
                .filter(|t| t.channel == *c)
                .filter_map(|t| t.amount)
                .sum();
            (*c, total)
        })
        .collect()
}

/// Share of each key indicator's gift rows that came through each channel
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorShare {
    pub indicator: String,
    pub offline: f64,
    pub online: f64,
}

impl IndicatorShare {
    pub fn share(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Offline => self.offline,
            Channel::Online => self.online,
        }
    }
}

/// Sorted by indicator
pub fn indicator_shares(donors: &[DonorRecord]) -> Vec<IndicatorShare> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for d in donors {
        let Some(channel) = d.channel else { continue };
        let entry = counts.entry(d.key_indicator.as_str()).or_default();
        match channel {
            Channel::Offline => entry.0 += 1,
            Channel::Online => entry.1 += 1,
        }
    }

    counts
        .into_iter()
        .map(|(indicator, (offline, online))| {
            let total = (offline + online) as f64;
            IndicatorShare {
                indicator: indicator.to_string(),
                offline: offline as f64 / total,
                online: online as f64 / total,
            }
        })
        .collect()
}

/// Known ages (0 means unknown and is dropped)
pub fn known_ages(donors: &[DonorRecord]) -> Vec<f64> {
    donors
        .iter()
        .filter(|d| d.age > 0)
        .map(|d| d.age as f64)
        .collect()
}

/// Gift rows per generation, most common first (ties keep age order).
/// Empty generations are kept with a zero count.
pub fn generation_counts(donors: &[DonorRecord]) -> Vec<(Generation, usize)> {
    let mut counts: Vec<(Generation, usize)> = Generation::ALL
        .iter()
        .map(|g| (*g, donors.iter().filter(|d| d.generation() == Some(*g)).count()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Summed precomputed fiscal-year giving, FY18 through FY24
pub fn fiscal_totals(donors: &[DonorRecord]) -> Vec<(FiscalYear, f64)> {
    FiscalYear::ALL
        .iter()
        .map(|fy| (*fy, donors.iter().filter_map(|d| d.fiscal_amount(*fy)).sum()))
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Mean gift amount per generation in age order; generations without any
/// amount are left out.
pub fn average_gift_by_generation(donors: &[DonorRecord]) -> Vec<(Generation, f64)> {
    Generation::ALL
        .iter()
        .filter_map(|g| {
            let avg = mean(
                donors
                    .iter()
                    .filter(|d| d.generation() == Some(*g))
                    .filter_map(|d| d.fund_split_amount),
            )?;
            Some((*g, avg))
        })
        .collect()
}

/// Fraction of gift rows made online per generation, highest first
pub fn online_share_by_generation(donors: &[DonorRecord]) -> Vec<(Generation, f64)> {
    let mut shares: Vec<(Generation, f64)> = Generation::ALL
        .iter()
        .filter_map(|g| {
            let share = mean(
                donors
                    .iter()
                    .filter(|d| d.generation() == Some(*g))
                    .filter_map(|d| d.channel)
                    .map(|c| if c.is_online() { 1.0 } else { 0.0 }),
            )?;
            Some((*g, share))
        })
        .collect();
    shares.sort_by(|a, b| b.1.total_cmp(&a.1));
    shares
}

/// Per donor: how many gifts (binned) and what share of them were online
#[derive(Debug, Clone, PartialEq)]
pub struct DonorFrequency {
    pub constituent_id: String,
    pub bin: FrequencyBin,
    pub online_share: f64,
}

#[derive(Default)]
struct GiftTally {
    gifts: usize,
    flagged: usize,
    online: usize,
}

/// One entry per constituent, ordered by constituent id. Every gift row
/// counts toward the bin; the online share is taken over flagged rows only.
pub fn donor_frequency(donors: &[DonorRecord]) -> Vec<DonorFrequency> {
    let mut per_donor: HashMap<&str, GiftTally> = HashMap::new();
    for d in donors {
        let tally = per_donor.entry(d.constituent_id.as_str()).or_default();
        tally.gifts += 1;
        if let Some(channel) = d.channel {
            tally.flagged += 1;
            if channel.is_online() {
                tally.online += 1;
            }
        }
    }

    let mut out: Vec<DonorFrequency> = per_donor
        .into_iter()
        .filter_map(|(id, tally)| {
            Some(DonorFrequency {
                constituent_id: id.to_string(),
                bin: FrequencyBin::from_count(tally.gifts)?,
                online_share: if tally.flagged == 0 {
                    0.0
                } else {
                    tally.online as f64 / tally.flagged as f64
                },
            })
        })
        .collect();
    out.sort_by(|a, b| a.constituent_id.cmp(&b.constituent_id));
    out
}
