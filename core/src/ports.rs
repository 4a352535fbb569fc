//! Contracts for the collaborators a [`FolderWatcher`](crate::watcher::FolderWatcher) talks to.
//!
//! The backend supplies sorted pages of entries and a bare "something changed"
//! signal; the presenter receives the resulting deltas. Neither side is
//! assumed to run on any particular thread.

use std::time::Duration;

use crate::error::MirrorError;
use crate::types::Entry;

/// Callback fired by a backend whenever the folder may have changed. Carries no payload.
pub type ChangeCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Source of folder contents and change notifications.
///
/// # Ordering
///
/// `enumerate` must return entries sorted by
/// [`NaturalComparator::compare_entries`](crate::natural::NaturalComparator::compare_entries),
/// with the same comparator the watcher was given. The sync engine rejects
/// out-of-order pages with [`MirrorError::BackendFailure`].
pub trait FolderBackend: Send + Sync {
    /// Short human readable description used in log output.
    fn describe(&self) -> String;

    /// Fetch up to `page_size` entries starting at item offset `start`.
    ///
    /// An empty page ends the enumeration. The watcher advances `start` by the
    /// number of entries actually returned.
    fn enumerate(&self, start: usize, page_size: usize) -> crate::Result<Vec<Entry>>;

    /// Register the change callback. Called once by the watcher at start-up.
    fn subscribe_changes(&self, callback: ChangeCallback) -> crate::Result<()>;

    /// Drop the registered callback. Called once on teardown.
    fn unsubscribe(&self);
}

/// Receiver of the deltas produced by each scan.
pub trait Presenter: Send + Sync {
    /// One batch of changes. Never called with both slices empty.
    fn on_delta(&self, added: &[Entry], removed: &[Entry]);

    /// A scan (initial or incremental) finished and its result is committed.
    fn on_scan_complete(&self, elapsed: Duration);

    /// A scan aborted without committing. The watcher keeps running.
    fn on_scan_failed(&self, error: &MirrorError) {
        let _ = error;
    }
}
