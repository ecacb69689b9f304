// Error types for loading donation exports

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single cell was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseReason {
    Date,
    Amount,
    Number,
}

impl fmt::Display for ParseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            ParseReason::Date => "unparseable date",
            ParseReason::Amount => "unparseable amount",
            ParseReason::Number => "unparseable number",
        };
        f.write_str(what)
    }
}

/// A gift date that could not be parsed; aborts the whole load
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column '{column}': {reason} '{value}'")]
pub struct ParseError {
    /// 1-based line in the file (header is line 1)
    pub line: u64,
    pub column: String,
    pub value: String,
    pub reason: ParseReason,
}

/// Loading an export failed
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("opening {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("building cell parsers: {0}")]
    Pattern(#[from] regex::Error),
}
