use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use giftcast_charts::{render, ChartKind, Dataset, KeyMetrics};
use giftcast_core::{forecast_monthly, Channel, MonthRange, MonthlyBucket, YearMonth, HORIZON};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dataset;
mod state;

use config::{Config, DataSection, RangeSection, Source};
use dataset::DataLoader;

#[derive(Parser, Debug)]
#[command(name = "giftcast", version, about = "Donation dashboard charts and forecasts")]
struct Cli {
    /// Config file (default: ~/.giftcast/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available chart views
    Views,

    /// Render one chart view as JSON
    Chart {
        /// View slug, e.g. online-forecast (see `giftcast views`)
        #[arg(long)]
        view: ChartKind,

        #[command(flatten)]
        data: DataArgs,

        /// Write the JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Keep running and re-render whenever an input file changes
        #[arg(long)]
        watch: bool,

        /// Seconds between file checks in watch mode
        #[arg(long, default_value_t = 2, requires = "watch")]
        interval: u64,
    },

    /// Print the online and offline donation totals
    Metrics {
        #[command(flatten)]
        data: DataArgs,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the observed tail and the 12-month forecast for one channel
    Forecast {
        #[arg(long, value_enum, default_value_t = SeriesChoice::Total)]
        channel: SeriesChoice,

        #[command(flatten)]
        data: DataArgs,

        /// Observed months to show before the forecast
        #[arg(long, default_value_t = 12)]
        tail: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,
    /// Print the effective config
    Show,
}

/// Data location and month range; flags override the config file
#[derive(Args, Debug, Default)]
struct DataArgs {
    /// Combined donor export with an online flag column
    #[arg(long, conflicts_with_all = ["online", "offline"])]
    donors: Option<PathBuf>,

    /// Online-only export (use with --offline)
    #[arg(long, requires = "offline")]
    online: Option<PathBuf>,

    /// Offline-only export (use with --online)
    #[arg(long, requires = "online")]
    offline: Option<PathBuf>,

    /// First month of the grid, YYYY-MM
    #[arg(long)]
    start: Option<YearMonth>,

    /// Last month of the grid, YYYY-MM
    #[arg(long)]
    end: Option<YearMonth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SeriesChoice {
    Online,
    Offline,
    Total,
}

impl SeriesChoice {
    fn label(&self) -> &'static str {
        match self {
            SeriesChoice::Online => "Online",
            SeriesChoice::Offline => "Offline",
            SeriesChoice::Total => "Total",
        }
    }

    fn series(&self, dataset: &Dataset) -> Vec<MonthlyBucket> {
        let series = dataset.series();
        match self {
            SeriesChoice::Online => series.channel(Channel::Online).to_vec(),
            SeriesChoice::Offline => series.channel(Channel::Offline).to_vec(),
            SeriesChoice::Total => series.total(),
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "giftcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Views => {
            for kind in ChartKind::ALL {
                println!("{:<34} {}", kind.slug(), kind.title());
            }
        }

        Command::Chart {
            view,
            data,
            out,
            watch,
            interval,
        } => {
            let cfg = config::load_config(config_path)?;
            let (source, range) = resolve(&cfg, &data)?;
            let mut loader = DataLoader::new(cfg.columns.clone());

            if !watch {
                let dataset = loader.dataset(&source, range)?;
                return write_chart(view, &dataset, out.as_deref());
            }
            watch_chart(&mut loader, &source, range, view, out.as_deref(), interval)?;
        }

        Command::Metrics { data, json } => {
            let cfg = config::load_config(config_path)?;
            let dataset = load_dataset(&cfg, &data)?;
            let metrics = dataset.metrics();
            if json {
                println!("{}", serde_json::to_string_pretty(metrics)?);
            } else {
                print!("{}", metrics_text(metrics));
            }
        }

        Command::Forecast {
            channel,
            data,
            tail,
            json,
        } => {
            let cfg = config::load_config(config_path)?;
            let dataset = load_dataset(&cfg, &data)?;
            print_forecast(channel, &dataset, tail, json)?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(config_path)?,
            ConfigCommand::Show => config::show_config(config_path)?,
        },
    }

    Ok(())
}

fn month_range(cfg: &Config, args: &DataArgs) -> Result<MonthRange> {
    RangeSection {
        start: args.start.unwrap_or(cfg.range.start),
        end: args.end.unwrap_or(cfg.range.end),
    }
    .to_range()
}

fn resolve(cfg: &Config, args: &DataArgs) -> Result<(Source, MonthRange)> {
    let flags = DataSection {
        donors: args.donors.clone(),
        online: args.online.clone(),
        offline: args.offline.clone(),
    };
    let source = cfg.data.merged(&flags).source()?;
    Ok((source, month_range(cfg, args)?))
}

fn load_dataset(cfg: &Config, args: &DataArgs) -> Result<Dataset> {
    let (source, range) = resolve(cfg, args)?;
    DataLoader::new(cfg.columns.clone()).dataset(&source, range)
}

fn write_chart(view: ChartKind, dataset: &Dataset, out: Option<&Path>) -> Result<()> {
    let figure = render(view, dataset).with_context(|| format!("rendering {view}"))?;
    let json = figure.to_json().context("serialize figure")?;

    match out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            info!(chart = %view, path = %path.display(), "wrote chart");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Render once, then poll the inputs and render again each time the loader
/// had to re-read a file. Load and render failures after the first render
/// are logged and the previous output is left in place.
fn watch_chart(
    loader: &mut DataLoader,
    source: &Source,
    range: MonthRange,
    view: ChartKind,
    out: Option<&Path>,
    interval: u64,
) -> Result<()> {
    let dataset = loader.dataset(source, range)?;
    write_chart(view, &dataset, out)?;
    let mut seen = loader.reloads();
    info!(chart = %view, interval, "watching inputs for changes");

    loop {
        thread::sleep(Duration::from_secs(interval.max(1)));
        match loader.dataset(source, range) {
            Ok(_) if loader.reloads() == seen => {}
            Ok(dataset) => {
                seen = loader.reloads();
                if let Err(err) = write_chart(view, &dataset, out) {
                    warn!(chart = %view, "re-render failed: {err:#}");
                }
            }
            Err(err) => warn!(chart = %view, "reload failed: {err:#}"),
        }
    }
}

fn metrics_text(metrics: &KeyMetrics) -> String {
    metrics
        .rows()
        .into_iter()
        .map(|(label, amount)| format!("{label}: {amount}\n"))
        .collect()
}

fn print_forecast(choice: SeriesChoice, dataset: &Dataset, tail: usize, json: bool) -> Result<()> {
    let observed = choice.series(dataset);
    let forecast = forecast_monthly(&observed)
        .with_context(|| format!("forecasting {} donations", choice.label().to_lowercase()))?;
    let shown = &observed[observed.len().saturating_sub(tail)..];

    if json {
        let value = serde_json::json!({
            "channel": choice.label(),
            "observed": shown,
            "forecast": forecast,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "{} donations: {} observed months, {} month forecast\n",
        choice.label(),
        observed.len(),
        HORIZON
    );
    for b in shown {
        println!("{}  observed  {:>12.2}", YearMonth::of(b.period), b.total);
    }
    for p in &forecast {
        println!("{}  forecast  {:>12.2}", YearMonth::of(p.period), p.value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chart_command() {
        let cli = Cli::try_parse_from([
            "giftcast",
            "chart",
            "--view",
            "online-forecast",
            "--donors",
            "donations.csv",
            "--start",
            "2018-01",
        ])
        .unwrap();

        match cli.command {
            Command::Chart {
                view,
                data,
                out,
                watch,
                ..
            } => {
                assert_eq!(view, ChartKind::OnlineForecast);
                assert_eq!(data.donors, Some(PathBuf::from("donations.csv")));
                assert_eq!(data.start, Some("2018-01".parse().unwrap()));
                assert!(out.is_none());
                assert!(!watch);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_view_and_mixed_sources() {
        assert!(Cli::try_parse_from(["giftcast", "chart", "--view", "sunburst"]).is_err());
        assert!(
            Cli::try_parse_from([
                "giftcast", "chart", "--view", "age", "--donors", "a.csv", "--online", "b.csv",
                "--offline", "c.csv",
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["giftcast", "forecast", "--online", "b.csv"]).is_err());
    }

    #[test]
    fn test_flags_override_config_range() {
        let cfg = Config::default();
        let args = DataArgs {
            end: Some("2020-06".parse().unwrap()),
            ..DataArgs::default()
        };
        let range = month_range(&cfg, &args).unwrap();
        assert_eq!(range.start().to_string(), "2017-07");
        assert_eq!(range.len(), 36);

        let inverted = DataArgs {
            start: Some("2021-01".parse().unwrap()),
            ..args
        };
        assert!(month_range(&cfg, &inverted).is_err());
    }

    #[test]
    fn test_forecast_defaults_to_total() {
        let cli = Cli::try_parse_from(["giftcast", "forecast", "--donors", "d.csv"]).unwrap();
        match cli.command {
            Command::Forecast { channel, tail, json, .. } => {
                assert_eq!(channel, SeriesChoice::Total);
                assert_eq!(tail, 12);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_watch_flags() {
        let cli = Cli::try_parse_from([
            "giftcast", "chart", "--view", "age", "--donors", "d.csv", "--watch", "--interval", "5",
        ])
        .unwrap();
        match cli.command {
            Command::Chart { watch, interval, .. } => {
                assert!(watch);
                assert_eq!(interval, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(
            Cli::try_parse_from(["giftcast", "chart", "--view", "age", "--interval", "5"]).is_err()
        );
    }

    #[test]
    fn test_metrics_command_and_text() {
        let cli = Cli::try_parse_from(["giftcast", "metrics", "--donors", "d.csv", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Metrics { json: true, .. }));

        let metrics = KeyMetrics {
            total_online: 66061.7,
            total_offline: 107879.87,
        };
        assert_eq!(
            metrics_text(&metrics),
            "Total Online Donations: $66,061.70\nTotal Offline Donations: $107,879.87\n"
        );
    }

    #[test]
    fn test_metrics_from_fixture_table() {
        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .join("fixtures")
            .join("donations.csv");
        let args = DataArgs {
            donors: Some(fixture),
            ..DataArgs::default()
        };
        let dataset = load_dataset(&Config::default(), &args).unwrap();
        assert_eq!(
            metrics_text(dataset.metrics()),
            "Total Online Donations: $66,061.70\nTotal Offline Donations: $107,879.87\n"
        );
    }
}
