//! Live, naturally sorted mirror of a folder's contents.
//!
//! A [`FolderWatcher`] pulls sorted pages from a [`FolderBackend`], reconciles
//! them against its cached list and hands the resulting deltas to a
//! [`Presenter`]. [`NaturalComparator`] defines the order everything is kept in.

#![deny(missing_debug_implementations)]

pub mod cancel;
pub mod error;
pub mod fs;
pub mod log;
pub mod natural;
pub mod ports;
pub mod stats;
pub mod sync;
pub mod types;
pub mod watcher;

pub type Result<T> = std::result::Result<T, MirrorError>;

pub use cancel::CancellationToken;
pub use error::MirrorError;
pub use fs::{LocalFolder, LocalFolderOptions};
pub use natural::{NaturalComparator, NumberSeparators};
pub use ports::{ChangeCallback, FolderBackend, Presenter};
pub use stats::{ScanStatsCollector, ScanStatsSnapshot};
pub use sync::{DeltaBatch, ScanReport};
pub use types::{Entry, EntryKind, EntryMetadata};
pub use watcher::{DeltaDelivery, FolderWatcher, WatcherConfig, WatcherState};

/// Version of the core crate, for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_semver_version() {
        assert!(version().contains('.'));
    }

    #[test]
    fn crate_result_carries_mirror_errors() {
        fn fails() -> Result<()> {
            Err(MirrorError::Cancelled)
        }
        assert!(fails().unwrap_err().is_cancelled());
    }
}
