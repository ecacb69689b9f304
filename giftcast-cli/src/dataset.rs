use anyhow::{Context, Result};
use giftcast_charts::Dataset;
use giftcast_core::{Channel, DonorRecord, MonthRange, Transaction};
use giftcast_ingest::{load_donor_table, load_transactions, ChannelSource, ColumnSpec, TableCache};
use std::path::Path;
use std::sync::Arc;

use crate::config::Source;

/// Loads exports through path + mtime keyed caches. One loader kept alive
/// across calls only re-reads files whose mtime moved.
pub struct DataLoader {
    columns: ColumnSpec,
    donors: TableCache<Vec<DonorRecord>>,
    transactions: TableCache<Vec<Transaction>>,
    reloads: usize,
}

impl DataLoader {
    pub fn new(columns: ColumnSpec) -> Self {
        Self {
            columns,
            donors: TableCache::new(),
            transactions: TableCache::new(),
            reloads: 0,
        }
    }

    /// Files actually read from disk so far
    pub fn reloads(&self) -> usize {
        self.reloads
    }

    pub fn dataset(&mut self, source: &Source, range: MonthRange) -> Result<Dataset> {
        match source {
            Source::Donors(path) => {
                let donors = self.donor_table(path)?;
                Ok(Dataset::from_donors(donors, range))
            }
            Source::Split { online, offline } => {
                let mut txns = self.channel_export(online, Channel::Online)?.to_vec();
                txns.extend_from_slice(&self.channel_export(offline, Channel::Offline)?);
                Ok(Dataset::from_transactions(&txns, range))
            }
        }
    }

    fn donor_table(&mut self, path: &Path) -> Result<Arc<Vec<DonorRecord>>> {
        let columns = &self.columns;
        let reloads = &mut self.reloads;
        self.donors
            .get_or_load(path, |p| {
                *reloads += 1;
                load_donor_table(p, columns)
            })
            .with_context(|| format!("loading donor table {}", path.display()))
    }

    fn channel_export(&mut self, path: &Path, channel: Channel) -> Result<Arc<Vec<Transaction>>> {
        let columns = &self.columns;
        let reloads = &mut self.reloads;
        self.transactions
            .get_or_load(path, |p| {
                *reloads += 1;
                load_transactions(p, columns, ChannelSource::Fixed(channel))
            })
            .with_context(|| format!("loading {} export {}", channel.label().to_lowercase(), path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .join("fixtures")
            .join(name)
    }

    fn range() -> MonthRange {
        MonthRange::new("2017-07".parse().unwrap(), "2024-06".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_donor_source_has_table() {
        let mut loader = DataLoader::new(ColumnSpec::default());
        let ds = loader
            .dataset(&Source::Donors(fixture("donations.csv")), range())
            .unwrap();
        assert!(ds.has_donor_table());
        assert_eq!(ds.series().online.len(), 84);
    }

    #[test]
    fn test_split_source_has_series_only() {
        let mut loader = DataLoader::new(ColumnSpec::default());
        let source = Source::Split {
            online: fixture("online_donations.csv"),
            offline: fixture("offline_donations.csv"),
        };
        let ds = loader.dataset(&source, range()).unwrap();
        assert!(!ds.has_donor_table());
        assert!(ds.series().offline.iter().any(|b| b.total > 0.0));
    }

    #[test]
    fn test_missing_file_has_context() {
        let mut loader = DataLoader::new(ColumnSpec::default());
        let err = loader
            .dataset(&Source::Donors("/no/such/donations.csv".into()), range())
            .unwrap_err();
        assert!(format!("{err:#}").contains("loading donor table /no/such/donations.csv"));
    }

    #[test]
    fn test_kept_loader_rereads_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let online = dir.path().join("online.csv");
        let offline = dir.path().join("offline.csv");
        fs::write(&online, "Gift Date,Fund Split Amount\n2018-01-05,$10.00\n").unwrap();
        fs::write(&offline, "Gift Date,Fund Split Amount\n2018-01-09,$4.00\n").unwrap();
        let source = Source::Split {
            online: online.clone(),
            offline,
        };

        let mut loader = DataLoader::new(ColumnSpec::default());
        let first = loader.dataset(&source, range()).unwrap();
        assert_eq!(loader.reloads(), 2);
        assert_eq!(first.series().online[6].total, 10.0);

        loader.dataset(&source, range()).unwrap();
        assert_eq!(loader.reloads(), 2);

        fs::write(&online, "Gift Date,Fund Split Amount\n2018-01-05,$25.00\n").unwrap();
        let later = SystemTime::now() + Duration::from_secs(60);
        File::options().write(true).open(&online).unwrap().set_modified(later).unwrap();

        let second = loader.dataset(&source, range()).unwrap();
        assert_eq!(loader.reloads(), 3);
        assert_eq!(second.series().online[6].total, 25.0);
        assert_eq!(second.series().offline[6].total, 4.0);
    }
}
