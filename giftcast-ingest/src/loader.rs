//! Load donation exports into typed records.
//!
//! Exports are latin-1 delimited text with a header row. Column names are
//! exact matches. Only an unparseable gift date aborts the whole load. Any
//! other malformed cell (amount, age, online flag) is logged with its line
//! and read as missing.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ByteRecord, Reader, ReaderBuilder};
use giftcast_core::donation::clean_age;
use giftcast_core::{Channel, DonorRecord, FiscalYear, Transaction};
use tracing::{debug, info, warn};

use crate::error::{LoadError, ParseError, ParseReason};
use crate::parsers::{decode_latin1, parse_number, AmountParser, DateParser};
use crate::types::{ChannelSource, ColumnSpec};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
struct Column {
    index: usize,
    name: String,
}

/// An open export with its decoded header row
struct Sheet {
    path: PathBuf,
    reader: Reader<File>,
    headers: Vec<String>,
}

impl Sheet {
    fn open(path: &Path, delimiter: u8) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(file);

        let headers = reader
            .byte_headers()
            .map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let raw = if i == 0 { raw.strip_prefix(UTF8_BOM).unwrap_or(raw) } else { raw };
                decode_latin1(raw).trim().to_string()
            })
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
        })
    }

    fn optional(&self, name: &str) -> Option<Column> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|index| Column {
                index,
                name: name.to_string(),
            })
    }

    fn require(&self, name: &str) -> Result<Column, LoadError> {
        self.optional(name).ok_or_else(|| LoadError::MissingColumn {
            path: self.path.clone(),
            column: name.to_string(),
        })
    }

    /// Visit every data row; the first cell error stops the load.
    fn for_each_row<F>(&mut self, mut visit: F) -> Result<usize, LoadError>
    where
        F: FnMut(&Row<'_>) -> Result<(), ParseError>,
    {
        let mut record = ByteRecord::new();
        let mut rows = 0;
        loop {
            let more = self
                .reader
                .read_byte_record(&mut record)
                .map_err(|source| LoadError::Csv {
                    path: self.path.clone(),
                    source,
                })?;
            if !more {
                break;
            }
            rows += 1;
            let line = record.position().map(|p| p.line()).unwrap_or(rows as u64 + 1);
            visit(&Row { record: &record, line }).map_err(|source| LoadError::Parse {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(rows)
    }
}

/// One data row, with cell converters that report the offending line
struct Row<'a> {
    record: &'a ByteRecord,
    line: u64,
}

impl Row<'_> {
    /// Short rows read as empty cells
    fn text(&self, column: &Column) -> String {
        self.record
            .get(column.index)
            .map(decode_latin1)
            .unwrap_or_default()
    }

    fn reject(&self, column: &Column, value: String, reason: ParseReason) -> ParseError {
        ParseError {
            line: self.line,
            column: column.name.clone(),
            value,
            reason,
        }
    }

    fn date(&self, column: &Column, parser: &DateParser) -> Result<NaiveDate, ParseError> {
        let raw = self.text(column);
        parser
            .parse(&raw)
            .ok_or_else(|| self.reject(column, raw, ParseReason::Date))
    }

    fn missing(&self, column: &Column, raw: &str, reason: ParseReason) -> Option<f64> {
        warn!(line = self.line, column = %column.name, value = %raw, %reason, "cell read as missing");
        None
    }

    fn amount(&self, column: &Column, parser: &AmountParser) -> Option<f64> {
        let raw = self.text(column);
        parser
            .parse(&raw)
            .unwrap_or_else(|reason| self.missing(column, &raw, reason))
    }

    fn number(&self, column: &Column) -> Option<f64> {
        let raw = self.text(column);
        parse_number(&raw).unwrap_or_else(|reason| self.missing(column, &raw, reason))
    }

    /// `None` (with a warning naming the line) for a blank or non 0/1 flag
    fn channel(&self, column: &Column) -> Option<Channel> {
        let raw = self.text(column);
        let channel = Channel::from_flag(&raw);
        if channel.is_none() {
            warn!(line = self.line, column = %column.name, value = %raw, "unrecognised online flag");
        }
        channel
    }
}

enum ChannelFrom {
    Fixed(Channel),
    Column(Column),
}

/// Load gift date + amount rows as transactions, sorted by date (stable).
///
/// With `ChannelSource::Column`, rows whose online flag is blank or not 0/1
/// belong to neither channel and are left out.
pub fn load_transactions(
    path: impl AsRef<Path>,
    spec: &ColumnSpec,
    source: ChannelSource,
) -> Result<Vec<Transaction>, LoadError> {
    let path = path.as_ref();
    let mut sheet = Sheet::open(path, spec.delimiter_byte())?;

    let date_col = sheet.require(&spec.gift_date)?;
    let amount_col = sheet.require(&spec.amount)?;
    let channel_from = match source {
        ChannelSource::Fixed(channel) => ChannelFrom::Fixed(channel),
        ChannelSource::Column => ChannelFrom::Column(sheet.require(&spec.online)?),
    };

    let dates = DateParser::new()?;
    let amounts = AmountParser::new()?;

    let mut txns = Vec::new();
    let mut unflagged = 0usize;
    let rows = sheet.for_each_row(|row| {
        let date = row.date(&date_col, &dates)?;
        let amount = row.amount(&amount_col, &amounts);
        let channel = match &channel_from {
            ChannelFrom::Fixed(channel) => Some(*channel),
            ChannelFrom::Column(col) => row.channel(col),
        };
        match channel {
            Some(channel) => txns.push(Transaction { date, amount, channel }),
            None => unflagged += 1,
        }
        Ok(())
    })?;

    txns.sort_by_key(|t| t.date);

    let missing = txns.iter().filter(|t| t.amount.is_none()).count();
    info!(
        path = %path.display(),
        rows,
        missing_amounts = missing,
        unflagged,
        "loaded transactions"
    );
    Ok(txns)
}

/// Load the full donor table, sorted by gift date (stable).
///
/// Age is cleaned on the way in (missing, 1 and 152 become 0). Fiscal-year
/// giving columns are optional.
pub fn load_donor_table(path: impl AsRef<Path>, spec: &ColumnSpec) -> Result<Vec<DonorRecord>, LoadError> {
    let path = path.as_ref();
    let mut sheet = Sheet::open(path, spec.delimiter_byte())?;

    let id_col = sheet.require(&spec.constituent_id)?;
    let date_col = sheet.require(&spec.gift_date)?;
    let amount_col = sheet.require(&spec.amount)?;
    let online_col = sheet.require(&spec.online)?;
    let age_col = sheet.require(&spec.age)?;
    let indicator_col = sheet.require(&spec.key_indicator)?;

    let fiscal_cols: Vec<(FiscalYear, Option<Column>)> = FiscalYear::ALL
        .iter()
        .map(|fy| (*fy, sheet.optional(&spec.fiscal_column(*fy))))
        .collect();
    for (fy, col) in &fiscal_cols {
        if col.is_none() {
            debug!(path = %path.display(), column = %spec.fiscal_column(*fy), "fiscal column absent");
        }
    }

    let dates = DateParser::new()?;
    let amounts = AmountParser::new()?;

    let mut donors = Vec::new();
    let rows = sheet.for_each_row(|row| {
        let mut fiscal_giving = Vec::with_capacity(fiscal_cols.len());
        for (fy, col) in &fiscal_cols {
            let amount = match col {
                Some(col) => row.amount(col, &amounts),
                None => None,
            };
            fiscal_giving.push((*fy, amount));
        }

        donors.push(DonorRecord {
            constituent_id: row.text(&id_col).trim().to_string(),
            gift_date: row.date(&date_col, &dates)?,
            fund_split_amount: row.amount(&amount_col, &amounts),
            channel: row.channel(&online_col),
            age: clean_age(row.number(&age_col)),
            key_indicator: row.text(&indicator_col).trim().to_string(),
            fiscal_giving,
        });
        Ok(())
    })?;

    donors.sort_by_key(|d| d.gift_date);

    let unflagged = donors.iter().filter(|d| d.channel.is_none()).count();
    info!(path = %path.display(), rows, unflagged, "loaded donor table");
    Ok(donors)
}
