//! The dashboard's chart views. Each `ChartKind` maps to one pure render
//! function over a `Dataset`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use giftcast_core::{
    forecast_monthly, Channel, ChannelSeries, DonorRecord, FitError, FrequencyBin, MonthRange,
    MonthlyBucket, Transaction,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::breakdown;
use crate::figure::{BarMode, Figure, LineDash, Trace};
use crate::metrics::KeyMetrics;

const AGE_HISTOGRAM_BINS: usize = 20;

/// Every chart the dashboard can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    OnlineVsOffline,
    GiftAmount,
    DonorType,
    Age,
    Generation,
    FiscalYear,
    AverageGiftByGeneration,
    OnlinePreferenceByGeneration,
    OnlineFrequency,
    OnlineForecast,
    OfflineForecast,
    TotalForecast,
}

pub type RenderFn = fn(&Dataset) -> Result<Figure, RenderError>;

impl ChartKind {
    pub const ALL: [ChartKind; 12] = [
        ChartKind::OnlineVsOffline,
        ChartKind::GiftAmount,
        ChartKind::DonorType,
        ChartKind::Age,
        ChartKind::Generation,
        ChartKind::FiscalYear,
        ChartKind::AverageGiftByGeneration,
        ChartKind::OnlinePreferenceByGeneration,
        ChartKind::OnlineFrequency,
        ChartKind::OnlineForecast,
        ChartKind::OfflineForecast,
        ChartKind::TotalForecast,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ChartKind::OnlineVsOffline => "online-vs-offline",
            ChartKind::GiftAmount => "gift-amount",
            ChartKind::DonorType => "donor-type",
            ChartKind::Age => "age",
            ChartKind::Generation => "generation",
            ChartKind::FiscalYear => "fiscal-year",
            ChartKind::AverageGiftByGeneration => "average-gift-by-generation",
            ChartKind::OnlinePreferenceByGeneration => "online-preference-by-generation",
            ChartKind::OnlineFrequency => "online-frequency",
            ChartKind::OnlineForecast => "online-forecast",
            ChartKind::OfflineForecast => "offline-forecast",
            ChartKind::TotalForecast => "total-forecast",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::OnlineVsOffline => "Online vs Offline Distribution",
            ChartKind::GiftAmount => "Gift Amount Distribution",
            ChartKind::DonorType => "Donor Type Distribution",
            ChartKind::Age => "Age Distribution",
            ChartKind::Generation => "Generation Distribution",
            ChartKind::FiscalYear => "Giving Trends by Fiscal Year",
            ChartKind::AverageGiftByGeneration => "Average Gift by Generation",
            ChartKind::OnlinePreferenceByGeneration => "Online Preference by Generation",
            ChartKind::OnlineFrequency => "Online Donation Frequency",
            ChartKind::OnlineForecast => "Online Donations with Exponential Smoothing Forecast",
            ChartKind::OfflineForecast => "Offline Donations with Exponential Smoothing Forecast",
            ChartKind::TotalForecast => "Total Monthly Donations with Exponential Smoothing Forecast",
        }
    }

    /// Views that only need the monthly channel series
    pub fn is_forecast(&self) -> bool {
        matches!(
            self,
            ChartKind::OnlineForecast | ChartKind::OfflineForecast | ChartKind::TotalForecast
        )
    }

    pub fn renderer(&self) -> RenderFn {
        match self {
            ChartKind::OnlineVsOffline => render_online_vs_offline,
            ChartKind::GiftAmount => render_gift_amount,
            ChartKind::DonorType => render_donor_type,
            ChartKind::Age => render_age,
            ChartKind::Generation => render_generation,
            ChartKind::FiscalYear => render_fiscal_year,
            ChartKind::AverageGiftByGeneration => render_average_gift,
            ChartKind::OnlinePreferenceByGeneration => render_online_preference,
            ChartKind::OnlineFrequency => render_online_frequency,
            ChartKind::OnlineForecast => render_online_forecast,
            ChartKind::OfflineForecast => render_offline_forecast,
            ChartKind::TotalForecast => render_total_forecast,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown chart '{0}'")]
pub struct UnknownChart(pub String);

impl FromStr for ChartKind {
    type Err = UnknownChart;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownChart(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("'{0}' needs the full donor table; only channel exports were loaded")]
    DonorTableRequired(ChartKind),

    #[error("'{kind}' forecast failed: {source}")]
    Fit {
        kind: ChartKind,
        #[source]
        source: FitError,
    },
}

/// Everything a view may draw from
#[derive(Debug, Clone)]
pub struct Dataset {
    donors: Option<Arc<Vec<DonorRecord>>>,
    series: ChannelSeries,
    metrics: KeyMetrics,
}

impl Dataset {
    /// Full donor table; the monthly series are derived from the rows with
    /// a known channel.
    pub fn from_donors(donors: Arc<Vec<DonorRecord>>, range: MonthRange) -> Self {
        let txns: Vec<Transaction> = donors.iter().filter_map(DonorRecord::to_transaction).collect();
        Self {
            series: ChannelSeries::build(&txns, range),
            metrics: KeyMetrics::from_transactions(&txns),
            donors: Some(donors),
        }
    }

    /// Transactions only (split online/offline exports); breakdown views are
    /// unavailable.
    pub fn from_transactions(txns: &[Transaction], range: MonthRange) -> Self {
        Self {
            donors: None,
            series: ChannelSeries::build(txns, range),
            metrics: KeyMetrics::from_transactions(txns),
        }
    }

    pub fn series(&self) -> &ChannelSeries {
        &self.series
    }

    /// Channel totals over every loaded gift, regardless of the month range
    pub fn metrics(&self) -> &KeyMetrics {
        &self.metrics
    }

    pub fn has_donor_table(&self) -> bool {
        self.donors.is_some()
    }

    fn donors(&self, kind: ChartKind) -> Result<&[DonorRecord], RenderError> {
        self.donors
            .as_deref()
            .map(Vec::as_slice)
            .ok_or(RenderError::DonorTableRequired(kind))
    }
}

/// Render one view
pub fn render(kind: ChartKind, dataset: &Dataset) -> Result<Figure, RenderError> {
    debug!(chart = %kind, "rendering chart");
    (kind.renderer())(dataset)
}

fn labelled<T, V>(
    items: Vec<(T, V)>,
    label: impl Fn(&T) -> &'static str,
    value: impl Fn(V) -> f64,
) -> Vec<(String, f64)> {
    items
        .into_iter()
        .map(|(k, v)| (label(&k).to_string(), value(v)))
        .collect()
}

fn render_online_vs_offline(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::OnlineVsOffline;
    let counts = breakdown::channel_counts(ds.donors(kind)?);
    Ok(Figure::new(kind.title()).with_trace(Trace::pie(labelled(counts, Channel::label, |n| n as f64))))
}

fn render_gift_amount(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::GiftAmount;
    let sums = breakdown::channel_amounts(ds.donors(kind)?);
    Ok(Figure::new(kind.title()).with_trace(Trace::pie(labelled(sums, Channel::label, |v| v))))
}

fn render_donor_type(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::DonorType;
    let shares = breakdown::indicator_shares(ds.donors(kind)?);

    let mut fig = Figure::new(kind.title()).with_axis_titles("Key Indicator", "Percentage");
    for channel in Channel::ALL {
        let bars = shares
            .iter()
            .map(|s| (s.indicator.clone(), s.share(channel)))
            .collect();
        fig = fig.with_trace(Trace::bar(Some(channel.label()), bars));
    }
    fig.layout.barmode = Some(BarMode::Stack);
    fig.layout.showlegend = Some(true);
    Ok(fig)
}

fn render_age(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::Age;
    let ages = breakdown::known_ages(ds.donors(kind)?);

    let mut fig = Figure::new(kind.title())
        .with_trace(Trace::Histogram {
            name: kind.title().to_string(),
            x: ages,
            nbinsx: AGE_HISTOGRAM_BINS,
        })
        .with_axis_titles("Age", "Count");
    fig.layout.bargap = Some(0.1);
    Ok(fig)
}

fn render_generation(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::Generation;
    let counts = breakdown::generation_counts(ds.donors(kind)?);
    Ok(Figure::new(kind.title())
        .with_trace(Trace::bar(None, labelled(counts, |g| g.label(), |n| n as f64)))
        .with_axis_titles("Age Group", "Count"))
}

fn render_fiscal_year(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::FiscalYear;
    let totals = breakdown::fiscal_totals(ds.donors(kind)?);
    Ok(Figure::new(kind.title())
        .with_trace(Trace::bar(None, labelled(totals, |fy| fy.label(), |v| v)))
        .with_axis_titles("Fiscal Year", "Total Amount"))
}

fn render_average_gift(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::AverageGiftByGeneration;
    let averages = breakdown::average_gift_by_generation(ds.donors(kind)?);
    Ok(Figure::new(kind.title())
        .with_trace(Trace::bar(None, labelled(averages, |g| g.label(), |v| v)))
        .with_axis_titles("Age Group", "Average Gift Amount"))
}

fn render_online_preference(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::OnlinePreferenceByGeneration;
    let shares = breakdown::online_share_by_generation(ds.donors(kind)?);
    Ok(Figure::new(kind.title())
        .with_trace(Trace::bar(None, labelled(shares, |g| g.label(), |v| v)))
        .with_axis_titles("Age Group", "Proportion of Online Donations"))
}

fn render_online_frequency(ds: &Dataset) -> Result<Figure, RenderError> {
    let kind = ChartKind::OnlineFrequency;
    let freq = breakdown::donor_frequency(ds.donors(kind)?);

    let (x, y) = freq
        .into_iter()
        .map(|f| (f.bin.label().to_string(), f.online_share))
        .unzip();
    let order = FrequencyBin::ALL.iter().map(|b| b.label().to_string()).collect();

    Ok(Figure::new(kind.title())
        .with_trace(Trace::Box { x, y })
        .with_axis_titles("Number of Donations", "Proportion of Online Donations")
        .with_x_categories(order))
}

/// Observed (solid) + forecast (dashed) lines on a shared date axis
pub fn forecast_figure(title: &str, label: &str, observed: &[MonthlyBucket]) -> Result<Figure, FitError> {
    let forecast = forecast_monthly(observed)?;

    let observed: Vec<_> = observed.iter().map(|b| (b.period, b.total)).collect();
    let projected: Vec<_> = forecast.iter().map(|p| (p.period, p.value)).collect();

    Ok(Figure::new(title)
        .with_trace(Trace::line(format!("{label} Observed"), &observed, LineDash::Solid))
        .with_trace(Trace::line(format!("{label} Forecast"), &projected, LineDash::Dash))
        .with_axis_titles("Date", "Gift Amount ($)")
        .as_time_series())
}

fn render_forecast(kind: ChartKind, label: &str, observed: &[MonthlyBucket]) -> Result<Figure, RenderError> {
    forecast_figure(kind.title(), label, observed).map_err(|source| RenderError::Fit { kind, source })
}

fn render_online_forecast(ds: &Dataset) -> Result<Figure, RenderError> {
    render_forecast(ChartKind::OnlineForecast, "Online", &ds.series.online)
}

fn render_offline_forecast(ds: &Dataset) -> Result<Figure, RenderError> {
    render_forecast(ChartKind::OfflineForecast, "Offline", &ds.series.offline)
}

fn render_total_forecast(ds: &Dataset) -> Result<Figure, RenderError> {
    render_forecast(ChartKind::TotalForecast, "Total", &ds.series.total())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use giftcast_core::{FiscalYear, YearMonth};

    fn range(start: &str, end: &str) -> MonthRange {
        MonthRange::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    fn seasonal_txns(r: MonthRange) -> Vec<Transaction> {
        r.iter()
            .enumerate()
            .flat_map(|(i, m)| {
                let day = m.first_day();
                let bump = if m.month() == 12 { 300.0 } else { 0.0 };
                [
                    Transaction::new(day, Some(100.0 + i as f64 + bump), Channel::Online),
                    Transaction::new(day, Some(200.0 + (i % 5) as f64 * 10.0), Channel::Offline),
                ]
            })
            .collect()
    }

    #[test]
    fn test_slugs_round_trip() {
        for kind in ChartKind::ALL {
            assert_eq!(kind.slug().parse::<ChartKind>(), Ok(kind));
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.slug());
        }
        assert_eq!("TOTAL-FORECAST".parse::<ChartKind>(), Ok(ChartKind::TotalForecast));
        assert!("pie".parse::<ChartKind>().is_err());
    }

    #[test]
    fn test_forecast_views_from_transactions() {
        let r = range("2017-07", "2020-06");
        let ds = Dataset::from_transactions(&seasonal_txns(r), r);

        for kind in [ChartKind::OnlineForecast, ChartKind::OfflineForecast, ChartKind::TotalForecast] {
            let fig = render(kind, &ds).unwrap();
            assert_eq!(fig.layout.title, kind.title());
            assert_eq!(fig.data.len(), 2);
            match (&fig.data[0], &fig.data[1]) {
                (
                    Trace::Scatter { x: obs_x, line: obs_line, .. },
                    Trace::Scatter { x: fc_x, y: fc_y, line: fc_line, .. },
                ) => {
                    assert_eq!(obs_x.len(), r.len());
                    assert_eq!(fc_x.len(), 12);
                    assert_eq!(fc_y.len(), 12);
                    assert_eq!(obs_line.dash, LineDash::Solid);
                    assert_eq!(fc_line.dash, LineDash::Dash);
                    let last = YearMonth::of(*obs_x.last().unwrap());
                    assert_eq!(YearMonth::of(fc_x[0]), last.succ());
                }
                other => panic!("unexpected traces: {other:?}"),
            }
        }
    }

    #[test]
    fn test_breakdown_views_need_donor_table() {
        let r = range("2017-07", "2020-06");
        let ds = Dataset::from_transactions(&seasonal_txns(r), r);
        assert!(!ds.has_donor_table());
        for kind in ChartKind::ALL.into_iter().filter(|k| !k.is_forecast()) {
            assert_eq!(render(kind, &ds), Err(RenderError::DonorTableRequired(kind)));
        }
    }

    #[test]
    fn test_short_range_surfaces_fit_error() {
        let r = range("2023-07", "2024-06");
        let ds = Dataset::from_transactions(&seasonal_txns(r), r);
        let err = render(ChartKind::TotalForecast, &ds).unwrap_err();
        assert_eq!(
            err,
            RenderError::Fit {
                kind: ChartKind::TotalForecast,
                source: FitError::TooShort { len: 12, required: 24 },
            }
        );
    }

    #[test]
    fn test_empty_range_is_constant_series() {
        let r = range("2017-07", "2024-06");
        let ds = Dataset::from_transactions(&[], r);
        assert_eq!(ds.series().total().len(), 84);
        assert!(matches!(
            render(ChartKind::OnlineForecast, &ds),
            Err(RenderError::Fit { source: FitError::Constant(_), .. })
        ));
    }

    #[test]
    fn test_breakdown_views_from_donor_table() {
        let donor = |id: &str, online: bool, age: i32| DonorRecord {
            constituent_id: id.to_string(),
            gift_date: NaiveDate::from_ymd_opt(2019, 1, 10).unwrap(),
            fund_split_amount: Some(40.0),
            channel: Some(if online { Channel::Online } else { Channel::Offline }),
            age,
            key_indicator: "I".to_string(),
            fiscal_giving: vec![(FiscalYear::FY19, Some(40.0))],
        };
        let donors = Arc::new(vec![donor("A", true, 30), donor("B", false, 0), donor("A", false, 30)]);
        let ds = Dataset::from_donors(donors, range("2018-07", "2019-06"));

        let pie = render(ChartKind::OnlineVsOffline, &ds).unwrap();
        assert_eq!(
            pie.data[0],
            Trace::pie(vec![("Offline".to_string(), 2.0), ("Online".to_string(), 1.0)])
        );

        let stacked = render(ChartKind::DonorType, &ds).unwrap();
        assert_eq!(stacked.data.len(), 2);
        assert_eq!(stacked.layout.barmode, Some(BarMode::Stack));

        let hist = render(ChartKind::Age, &ds).unwrap();
        assert!(matches!(&hist.data[0], Trace::Histogram { x, nbinsx: 20, .. } if x == &vec![30.0, 30.0]));

        let freq = render(ChartKind::OnlineFrequency, &ds).unwrap();
        match &freq.data[0] {
            Trace::Box { x, y } => {
                assert_eq!(x, &vec!["2".to_string(), "1".to_string()]);
                assert_eq!(y, &vec![0.5, 0.0]);
            }
            other => panic!("unexpected trace: {other:?}"),
        }
        let order = freq.layout.xaxis.as_ref().unwrap().categoryarray.as_ref().unwrap();
        assert_eq!(order.first().map(String::as_str), Some("1"));
        assert_eq!(order.last().map(String::as_str), Some("100+"));

        // monthly series still available from the donor table
        assert_eq!(ds.series().online[6].total, 40.0);
    }

    #[test]
    fn test_unflagged_donor_rows_stay_out_of_channel_views() {
        let donor = |id: &str, channel: Option<Channel>, age: i32| DonorRecord {
            constituent_id: id.to_string(),
            gift_date: NaiveDate::from_ymd_opt(2019, 1, 10).unwrap(),
            fund_split_amount: Some(25.0),
            channel,
            age,
            key_indicator: "I".to_string(),
            fiscal_giving: vec![(FiscalYear::FY19, Some(25.0))],
        };
        let donors = Arc::new(vec![
            donor("A", Some(Channel::Online), 30),
            donor("B", None, 45),
            donor("C", Some(Channel::Offline), -2),
        ]);
        let ds = Dataset::from_donors(donors, range("2018-07", "2019-06"));

        assert_eq!(ds.series().online[6].total, 25.0);
        assert_eq!(ds.series().offline[6].total, 25.0);
        assert_eq!(ds.metrics().total_online, 25.0);
        assert_eq!(ds.metrics().total_offline, 25.0);

        let pie = render(ChartKind::OnlineVsOffline, &ds).unwrap();
        assert_eq!(
            pie.data[0],
            Trace::pie(vec![("Offline".to_string(), 1.0), ("Online".to_string(), 1.0)])
        );

        let hist = render(ChartKind::Age, &ds).unwrap();
        assert!(matches!(&hist.data[0], Trace::Histogram { x, .. } if x == &vec![30.0, 45.0]));

        let fiscal = render(ChartKind::FiscalYear, &ds).unwrap();
        match &fiscal.data[0] {
            Trace::Bar { y, .. } => assert_eq!(y[1], 75.0),
            other => panic!("unexpected trace: {other:?}"),
        }
    }
}
