//! giftcast-charts: chart descriptors for the donations dashboard

pub mod breakdown;
pub mod figure;
pub mod metrics;
pub mod views;

pub use figure::{Figure, LineDash, Trace};
pub use metrics::{format_usd, KeyMetrics};
pub use views::{forecast_figure, render, ChartKind, Dataset, RenderError, UnknownChart};
