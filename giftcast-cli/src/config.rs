use anyhow::{bail, Context, Result};
use giftcast_core::{FiscalYear, MonthRange, YearMonth};
use giftcast_ingest::ColumnSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{default_config_path, ensure_giftcast_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataSection,
    pub range: RangeSection,
    pub columns: ColumnSpec,
}

/// Export locations. Either `donors` (combined table with an online flag)
/// or both `online` and `offline`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub donors: Option<PathBuf>,
    pub online: Option<PathBuf>,
    pub offline: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeSection {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl Default for RangeSection {
    fn default() -> Self {
        Self {
            start: FiscalYear::FY18.months().start(),
            end: FiscalYear::FY24.months().end(),
        }
    }
}

impl RangeSection {
    pub fn to_range(&self) -> Result<MonthRange> {
        MonthRange::new(self.start, self.end)
            .with_context(|| format!("invalid month range {}..{}", self.start, self.end))
    }
}

/// Where the dataset comes from once config and flags are merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Donors(PathBuf),
    Split { online: PathBuf, offline: PathBuf },
}

impl DataSection {
    /// Flags win over file values; a combined table wins over split exports.
    pub fn merged(&self, flags: &DataSection) -> DataSection {
        DataSection {
            donors: flags.donors.clone().or_else(|| self.donors.clone()),
            online: flags.online.clone().or_else(|| self.online.clone()),
            offline: flags.offline.clone().or_else(|| self.offline.clone()),
        }
    }

    pub fn source(&self) -> Result<Source> {
        if let Some(p) = &self.donors {
            return Ok(Source::Donors(p.clone()));
        }
        match (&self.online, &self.offline) {
            (Some(online), Some(offline)) => Ok(Source::Split {
                online: online.clone(),
                offline: offline.clone(),
            }),
            (None, None) => bail!(
                "no data configured: pass --donors <csv> (or --online/--offline), or set [data] in config.toml"
            ),
            _ => bail!("split exports need both an online and an offline file"),
        }
    }
}

pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_path(),
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let p = config_path(explicit)?;
    if !p.exists() {
        if explicit.is_some() {
            bail!("config not found: {}", p.display());
        }
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(explicit: Option<&Path>) -> Result<()> {
    if explicit.is_none() {
        ensure_giftcast_home()?;
    }
    let p = config_path(explicit)?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&p, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config(explicit: Option<&Path>) -> Result<()> {
    let cfg = load_config(explicit)?;
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}
