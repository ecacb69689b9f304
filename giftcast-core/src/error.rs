// Error types for month ranges and model fitting

use thiserror::Error;

use crate::month::YearMonth;

/// Invalid month or month range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("invalid month '{0}' (expected YYYY-MM)")]
    InvalidMonth(String),

    #[error("range end {end} is before start {start}")]
    Inverted { start: YearMonth, end: YearMonth },
}

/// The series cannot support a seasonal fit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("series has {len} observations, need at least {required}")]
    TooShort { len: usize, required: usize },

    #[error("series contains a non-finite value at index {0}")]
    NonFinite(usize),

    #[error("series is constant ({0}); nothing to fit")]
    Constant(f64),

    #[error("optimizer found no finite parameter set")]
    NoConvergence,
}
