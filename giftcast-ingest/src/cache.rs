//! Explicit table cache keyed by file path + modification time.
//!
//! A lookup reuses the stored table while the file's mtime is unchanged and
//! reloads it otherwise. Entries can also be dropped by hand.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::error::LoadError;

#[derive(Debug)]
struct Entry<T> {
    modified: SystemTime,
    table: Arc<T>,
}

#[derive(Debug)]
pub struct TableCache<T> {
    entries: HashMap<PathBuf, Entry<T>>,
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> TableCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, calling `load` when there is no
    /// entry or the file changed since it was cached.
    pub fn get_or_load<F>(&mut self, path: impl AsRef<Path>, load: F) -> Result<Arc<T>, LoadError>
    where
        F: FnOnce(&Path) -> Result<T, LoadError>,
    {
        let path = path.as_ref();
        let io_err = |source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let key = fs::canonicalize(path).map_err(io_err)?;
        let modified = fs::metadata(&key).and_then(|m| m.modified()).map_err(io_err)?;

        if let Some(entry) = self.entries.get(&key) {
            if entry.modified == modified {
                debug!(path = %key.display(), "table cache hit");
                return Ok(Arc::clone(&entry.table));
            }
            debug!(path = %key.display(), "table changed on disk, reloading");
        }

        let table = Arc::new(load(&key)?);
        self.entries.insert(
            key,
            Entry {
                modified,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Drop the entry for `path`; true if one was cached
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.entries.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;

    fn counting_loader(calls: &Cell<usize>) -> impl FnOnce(&Path) -> Result<String, LoadError> + '_ {
        move |p| {
            calls.set(calls.get() + 1);
            Ok(fs::read_to_string(p).unwrap())
        }
    }

    #[test]
    fn test_hit_until_mtime_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("donors.csv");
        fs::write(&path, "a").unwrap();

        let calls = Cell::new(0);
        let mut cache = TableCache::new();

        let first = cache.get_or_load(&path, counting_loader(&calls)).unwrap();
        let second = cache.get_or_load(&path, counting_loader(&calls)).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        let mut f = File::options().write(true).truncate(true).open(&path).unwrap();
        f.write_all(b"b").unwrap();
        f.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
        drop(f);

        let third = cache.get_or_load(&path, counting_loader(&calls)).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(third.as_str(), "b");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_manual_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("donors.csv");
        fs::write(&path, "a").unwrap();

        let calls = Cell::new(0);
        let mut cache = TableCache::new();
        cache.get_or_load(&path, counting_loader(&calls)).unwrap();

        assert!(cache.invalidate(&path));
        assert!(!cache.invalidate(&path));
        cache.get_or_load(&path, counting_loader(&calls)).unwrap();
        assert_eq!(calls.get(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut cache: TableCache<String> = TableCache::new();
        let err = cache
            .get_or_load("/no/such/donors.csv", |_| Ok(String::new()))
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(cache.is_empty());
    }
}
