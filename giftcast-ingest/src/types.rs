use giftcast_core::{Channel, FiscalYear};
use serde::{Deserialize, Serialize};

/// Where a transaction's channel comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSource {
    /// Read the `online` flag column of each row
    Column,
    /// Whole file belongs to one channel (split online/offline exports)
    Fixed(Channel),
}

/// Exact column names expected in the export, plus the field delimiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub delimiter: char,
    pub gift_date: String,
    pub amount: String,
    pub online: String,
    pub constituent_id: String,
    pub age: String,
    pub key_indicator: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            delimiter: ',',
            gift_date: "Gift Date".to_string(),
            amount: "Fund Split Amount".to_string(),
            online: "Online".to_string(),
            constituent_id: "Constituent ID".to_string(),
            age: "Age".to_string(),
            key_indicator: "Key Indicator".to_string(),
        }
    }
}

impl ColumnSpec {
    /// Column holding giving for `year`, e.g. "FY21 Giving". Optional in
    /// the export; absent ones read as missing.
    pub fn fiscal_column(&self, year: FiscalYear) -> String {
        year.column()
    }

    pub(crate) fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }
}
