//! Donation record types: transactions, monthly buckets, forecasts and the
//! full donor table row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::month::MonthRange;

/// Donation source category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    #[serde(rename = "offline")]
    Offline,
    #[serde(rename = "online")]
    Online,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Offline, Channel::Online];

    /// Display label used in chart legends
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Online => "Online",
            Channel::Offline => "Offline",
        }
    }

    /// Decode the `Online` flag column (`1` = online, `0` = offline).
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim() {
            "1" | "1.0" | "true" | "True" | "TRUE" => Some(Channel::Online),
            "0" | "0.0" | "false" | "False" | "FALSE" => Some(Channel::Offline),
            _ => None,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Channel::Online)
    }
}

/// A single gift event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    /// `None` when the amount cell was empty; excluded from sums.
    pub amount: Option<f64>,
    pub channel: Channel,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: Option<f64>, channel: Channel) -> Self {
        Self { date, amount, channel }
    }

    /// Amount for summation purposes (missing counts as 0)
    pub fn amount_or_zero(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }
}

/// Total giving for one calendar month
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MonthlyBucket {
    /// First day of the month
    pub period: NaiveDate,
    pub total: f64,
}

/// One projected month
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ForecastPoint {
    /// First day of the month
    pub period: NaiveDate,
    pub value: f64,
}

/// Fiscal years carried as precomputed giving columns in the donor table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FiscalYear {
    FY18,
    FY19,
    FY20,
    FY21,
    FY22,
    FY23,
    FY24,
}

impl FiscalYear {
    pub const ALL: [FiscalYear; 7] = [
        FiscalYear::FY18,
        FiscalYear::FY19,
        FiscalYear::FY20,
        FiscalYear::FY21,
        FiscalYear::FY22,
        FiscalYear::FY23,
        FiscalYear::FY24,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FiscalYear::FY18 => "FY18",
            FiscalYear::FY19 => "FY19",
            FiscalYear::FY20 => "FY20",
            FiscalYear::FY21 => "FY21",
            FiscalYear::FY22 => "FY22",
            FiscalYear::FY23 => "FY23",
            FiscalYear::FY24 => "FY24",
        }
    }

    /// Calendar year the fiscal year ends in
    pub fn end_year(&self) -> i32 {
        2018 + *self as i32
    }

    /// July through June
    pub fn months(&self) -> MonthRange {
        MonthRange::fiscal_year(self.end_year())
    }

    /// Source column name, e.g. "FY21 Giving"
    pub fn column(&self) -> String {
        format!("{} Giving", self.label())
    }
}

/// Age bucket used by the generation breakdowns
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generation {
    Uncategorized,
    GenerationZ,
    Millennials,
    GenerationX,
    BabyBoomers,
    SilentGeneration,
}

impl Generation {
    pub const ALL: [Generation; 6] = [
        Generation::Uncategorized,
        Generation::GenerationZ,
        Generation::Millennials,
        Generation::GenerationX,
        Generation::BabyBoomers,
        Generation::SilentGeneration,
    ];

    /// Left-closed bins: [0,21) [21,28) [28,44) [44,60) [60,78) [78,inf).
    /// Negative ages fall outside every bin.
    pub fn from_age(age: i32) -> Option<Self> {
        let generation = match age {
            i32::MIN..=-1 => return None,
            0..=20 => Generation::Uncategorized,
            21..=27 => Generation::GenerationZ,
            28..=43 => Generation::Millennials,
            44..=59 => Generation::GenerationX,
            60..=77 => Generation::BabyBoomers,
            _ => Generation::SilentGeneration,
        };
        Some(generation)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Generation::Uncategorized => "Uncategorized",
            Generation::GenerationZ => "Generation Z",
            Generation::Millennials => "Millennials",
            Generation::GenerationX => "Generation X",
            Generation::BabyBoomers => "Baby Boomers",
            Generation::SilentGeneration => "Silent Generation",
        }
    }
}

/// Bins for the number of gifts a single donor made
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrequencyBin {
    One,
    Two,
    ThreeToFive,
    SixToTen,
    ElevenToTwenty,
    TwentyOneToFifty,
    FiftyOneToHundred,
    OverHundred,
}

impl FrequencyBin {
    pub const ALL: [FrequencyBin; 8] = [
        FrequencyBin::One,
        FrequencyBin::Two,
        FrequencyBin::ThreeToFive,
        FrequencyBin::SixToTen,
        FrequencyBin::ElevenToTwenty,
        FrequencyBin::TwentyOneToFifty,
        FrequencyBin::FiftyOneToHundred,
        FrequencyBin::OverHundred,
    ];

    /// Right-closed bins over the gift count; zero gifts has no bin.
    pub fn from_count(count: usize) -> Option<Self> {
        let bin = match count {
            0 => return None,
            1 => FrequencyBin::One,
            2 => FrequencyBin::Two,
            3..=5 => FrequencyBin::ThreeToFive,
            6..=10 => FrequencyBin::SixToTen,
            11..=20 => FrequencyBin::ElevenToTwenty,
            21..=50 => FrequencyBin::TwentyOneToFifty,
            51..=100 => FrequencyBin::FiftyOneToHundred,
            _ => FrequencyBin::OverHundred,
        };
        Some(bin)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FrequencyBin::One => "1",
            FrequencyBin::Two => "2",
            FrequencyBin::ThreeToFive => "3-5",
            FrequencyBin::SixToTen => "6-10",
            FrequencyBin::ElevenToTwenty => "11-20",
            FrequencyBin::TwentyOneToFifty => "21-50",
            FrequencyBin::FiftyOneToHundred => "51-100",
            FrequencyBin::OverHundred => "100+",
        }
    }
}

/// One row of the full donor table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DonorRecord {
    pub constituent_id: String,
    pub gift_date: NaiveDate,
    pub fund_split_amount: Option<f64>,
    /// `None` when the online flag cell was blank or not 0/1
    pub channel: Option<Channel>,
    /// Cleaned age; 0 means unknown, negative values are kept as entered
    pub age: i32,
    pub key_indicator: String,
    /// Precomputed per-year giving, in `FiscalYear::ALL` order
    pub fiscal_giving: Vec<(FiscalYear, Option<f64>)>,
}

impl DonorRecord {
    pub fn generation(&self) -> Option<Generation> {
        Generation::from_age(self.age)
    }

    pub fn is_channel(&self, channel: Channel) -> bool {
        self.channel == Some(channel)
    }

    /// Project onto the transaction shape used by the aggregator; rows
    /// without a known channel have no place on either series.
    pub fn to_transaction(&self) -> Option<Transaction> {
        self.channel
            .map(|channel| Transaction::new(self.gift_date, self.fund_split_amount, channel))
    }

    pub fn fiscal_amount(&self, year: FiscalYear) -> Option<f64> {
        self.fiscal_giving
            .iter()
            .find(|(fy, _)| *fy == year)
            .and_then(|(_, amount)| *amount)
    }
}

/// Missing ages read as 0. Ages 1 and 152 are known data-entry sentinels
/// and count as unknown too.
pub fn clean_age(raw: Option<f64>) -> i32 {
    match raw {
        Some(a) if a.is_finite() => {
            let age = a.trunc() as i32;
            if age == 1 || age == 152 { 0 } else { age }
        }
        _ => 0,
    }
}
