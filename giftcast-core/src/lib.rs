//! giftcast-core: donation record types, monthly aggregation and the
//! damped Holt-Winters forecaster

pub mod aggregate;
pub mod donation;
pub mod error;
pub mod forecast;
pub mod month;
pub mod simplex;

pub use aggregate::{aggregate_monthly, ChannelSeries};
pub use donation::{
    Channel, DonorRecord, FiscalYear, ForecastPoint, FrequencyBin, Generation, MonthlyBucket,
    Transaction,
};
pub use error::{FitError, RangeError};
pub use forecast::{forecast_monthly, FittedModel, HoltWinters, SmoothingParams, HORIZON, SEASONAL_PERIODS};
pub use month::{MonthRange, YearMonth};
