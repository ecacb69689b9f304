//! giftcast-ingest: reads donation exports (latin-1 delimited text) into
//! typed records, plus a path + mtime keyed table cache.

pub mod cache;
pub mod error;
pub mod loader;
pub mod parsers;
pub mod types;

pub use cache::TableCache;
pub use error::{LoadError, ParseError, ParseReason};
pub use loader::{load_donor_table, load_transactions};
pub use types::{ChannelSource, ColumnSpec};
