//! Keeps a cached, naturally sorted list of a folder's entries in step with the folder.
//!
//! A [`FolderWatcher`] owns one worker thread. The worker runs the initial scan
//! as soon as the watcher starts and then one scan per queued request. Change
//! notifications from the backend and [`FolderWatcher::rescan`] both queue
//! requests; while one request is already waiting, further ones are dropped, so
//! at most one scan runs and at most one waits behind it.

pub mod config;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::error::MirrorError;
use crate::natural::NaturalComparator;
use crate::ports::{FolderBackend, Presenter};
use crate::stats::{ScanStatsCollector, ScanStatsSnapshot};
use crate::sync::{DeltaBatch, run_scan};
use crate::types::Entry;

pub use config::{DEFAULT_PAGE_SIZE, DeltaDelivery, WatcherConfig};

/// Lifecycle of a watcher as seen from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// No scan running.
    Idle,
    /// The first scan after start-up is running.
    InitialScanning,
    Scanning,
    /// Cancellation was requested. No further scans will run.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanKind {
    Initial,
    Incremental,
}

impl ScanKind {
    fn as_str(self) -> &'static str {
        match self {
            ScanKind::Initial => "initial",
            ScanKind::Incremental => "incremental",
        }
    }
}

enum Command {
    Scan,
    Shutdown,
}

struct Shared {
    backend: Arc<dyn FolderBackend>,
    presenter: Arc<dyn Presenter>,
    comparator: NaturalComparator,
    config: WatcherConfig,
    entries: RwLock<Arc<Vec<Entry>>>,
    scan_lock: Mutex<()>,
    state: Mutex<WatcherState>,
    scan_queued: AtomicBool,
    cancel: CancellationToken,
    stats: ScanStatsCollector,
    scan_ids: AtomicU64,
}

impl Shared {
    /// Queue a scan unless one is already waiting. Returns whether a scan was queued.
    fn request_scan(&self, commands: &Sender<Command>, reason: &'static str) -> bool {
        if self.cancel.is_cancelled() {
            debug!(target: "watcher", reason, "scan request ignored after cancellation");
            return false;
        }
        if self.scan_queued.swap(true, Ordering::SeqCst) {
            self.stats.record_notification(true);
            debug!(target: "watcher", reason, "scan already queued, request coalesced");
            return false;
        }

        self.stats.record_notification(false);
        if commands.send(Command::Scan).is_err() {
            self.scan_queued.store(false, Ordering::SeqCst);
            debug!(target: "watcher", reason, "scan worker gone, request dropped");
            return false;
        }
        debug!(target: "watcher", reason, "scan queued");
        true
    }

    fn set_state(&self, state: WatcherState) {
        *self.state.lock() = state;
    }

    fn settled_state(&self) -> WatcherState {
        if self.cancel.is_cancelled() { WatcherState::Cancelled } else { WatcherState::Idle }
    }

    fn scan(&self, kind: ScanKind) {
        let _scan = self.scan_lock.lock();
        if kind == ScanKind::Incremental {
            // Requests arriving from here on queue the next scan.
            self.scan_queued.store(false, Ordering::SeqCst);
        }
        if self.cancel.is_cancelled() {
            self.set_state(WatcherState::Cancelled);
            return;
        }

        let scan_id = self.scan_ids.fetch_add(1, Ordering::Relaxed) + 1;
        self.set_state(match kind {
            ScanKind::Initial => WatcherState::InitialScanning,
            ScanKind::Incremental => WatcherState::Scanning,
        });
        info!(target: "watcher", scan_id, kind = kind.as_str(), folder = %self.backend.describe(), "scan started");

        let previous = Vec::clone(&self.entries.read());
        let delivery = self.config.delivery;
        let presenter = &self.presenter;
        let mut held: Vec<DeltaBatch<Entry>> = Vec::new();

        let result = run_scan(
            self.backend.as_ref(),
            &self.comparator,
            previous,
            self.config.page_size,
            &self.cancel,
            |batch| match delivery {
                DeltaDelivery::Streaming => presenter.on_delta(&batch.added, &batch.removed),
                DeltaDelivery::Buffered => held.push(batch),
            },
        );

        match result {
            Ok(outcome) => {
                let report = outcome.report;
                let count = outcome.entries.len();
                *self.entries.write() = Arc::new(outcome.entries);
                self.stats.record_scan(report.elapsed, report.added, report.removed, count);
                self.set_state(self.settled_state());
                info!(
                    target: "watcher",
                    scan_id,
                    pages = report.pages,
                    entries = count,
                    added = report.added,
                    removed = report.removed,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "scan committed"
                );

                for batch in held {
                    presenter.on_delta(&batch.added, &batch.removed);
                }
                presenter.on_scan_complete(report.elapsed);
            }
            Err(err) => {
                if err.is_cancelled() {
                    self.stats.record_cancelled();
                    info!(target: "watcher", scan_id, "scan cancelled, nothing committed");
                } else if err.is_recoverable() {
                    self.stats.record_failed();
                    warn!(target: "watcher", scan_id, error = %err, "scan failed, nothing committed");
                } else {
                    self.stats.record_failed();
                    error!(target: "watcher", scan_id, error = %err, "scan rejected its input, nothing committed");
                }
                self.set_state(self.settled_state());
                presenter.on_scan_failed(&err);
            }
        }
    }
}

fn worker_loop(shared: Arc<Shared>, commands: Receiver<Command>) {
    shared.scan(ScanKind::Initial);
    while let Ok(command) = commands.recv() {
        match command {
            Command::Scan => shared.scan(ScanKind::Incremental),
            Command::Shutdown => break,
        }
    }
    debug!(target: "watcher", "scan worker stopped");
}

/// Live mirror of one folder.
///
/// Dropping the watcher tears it down: the running scan is cancelled, the
/// backend subscription is released and the worker thread is joined.
pub struct FolderWatcher {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl FolderWatcher {
    /// Subscribe to `backend`, spawn the worker, and start the initial scan.
    ///
    /// Returns once the worker is running; the initial scan's deltas arrive at
    /// `presenter` asynchronously.
    pub fn start(
        backend: Arc<dyn FolderBackend>,
        presenter: Arc<dyn Presenter>,
        comparator: NaturalComparator,
        config: WatcherConfig,
    ) -> crate::Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            backend: Arc::clone(&backend),
            presenter,
            comparator,
            config,
            entries: RwLock::new(Arc::new(Vec::new())),
            scan_lock: Mutex::new(()),
            state: Mutex::new(WatcherState::InitialScanning),
            scan_queued: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            stats: ScanStatsCollector::new(),
            scan_ids: AtomicU64::new(0),
        });
        let (commands, inbox) = mpsc::channel();

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let notify = commands.clone();
        backend.subscribe_changes(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.request_scan(&notify, "change notification");
            }
        }))?;

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("folder-mirror-scan".into())
            .spawn(move || worker_loop(worker_shared, inbox))
            .map_err(|err| {
                backend.unsubscribe();
                MirrorError::io("spawning scan worker", err)
            })?;

        info!(
            target: "watcher",
            folder = %backend.describe(),
            page_size = config.page_size,
            delivery = ?config.delivery,
            "watcher started"
        );
        Ok(Self { shared, commands, worker: Some(worker) })
    }

    /// The last committed list. Never reflects a partially reconciled scan.
    pub fn entries(&self) -> Arc<Vec<Entry>> {
        Arc::clone(&self.shared.entries.read())
    }

    pub fn state(&self) -> WatcherState {
        *self.shared.state.lock()
    }

    pub fn stats(&self) -> ScanStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn config(&self) -> WatcherConfig {
        self.shared.config
    }

    pub fn comparator(&self) -> &NaturalComparator {
        &self.shared.comparator
    }

    /// Ask for another scan, e.g. after a failure. Follows the same coalescing
    /// rules as backend notifications. Returns whether a scan was queued.
    pub fn rescan(&self) -> bool {
        self.shared.request_scan(&self.commands, "rescan")
    }

    /// Cancel the running scan and refuse further ones. Does not wait.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
        let mut state = self.shared.state.lock();
        if *state == WatcherState::Idle {
            *state = WatcherState::Cancelled;
        }
    }

    /// Tear down and wait for the worker to finish.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.shared.cancel.cancel();
        self.shared.backend.unsubscribe();
        let _ = self.commands.send(Command::Shutdown);
        self.shared.set_state(WatcherState::Cancelled);

        if worker.thread().id() == thread::current().id() {
            // Dropped from inside a presenter callback; the worker exits on its own.
            return;
        }
        if worker.join().is_err() {
            warn!(target: "watcher", "scan worker panicked");
        }
        // A scan that raced the cancel may have overwritten the state.
        self.shared.set_state(WatcherState::Cancelled);
        debug!(target: "watcher", "watcher shut down");
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for FolderWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderWatcher")
            .field("folder", &self.shared.backend.describe())
            .field("state", &self.state())
            .field("entries", &self.shared.entries.read().len())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Condvar;

    use super::*;
    use crate::natural::NumberSeparators;
    use crate::ports::ChangeCallback;

    const WAIT: Duration = Duration::from_secs(5);

    struct OneFile;

    impl FolderBackend for OneFile {
        fn describe(&self) -> String {
            "one file".into()
        }

        fn enumerate(&self, start: usize, _page_size: usize) -> crate::Result<Vec<Entry>> {
            if start == 0 { Ok(vec![Entry::file("a")?]) } else { Ok(Vec::new()) }
        }

        fn subscribe_changes(&self, _callback: ChangeCallback) -> crate::Result<()> {
            Ok(())
        }

        fn unsubscribe(&self) {}
    }

    struct RejectsInput;

    impl FolderBackend for RejectsInput {
        fn describe(&self) -> String {
            "rejects input".into()
        }

        fn enumerate(&self, _start: usize, _page_size: usize) -> crate::Result<Vec<Entry>> {
            Err(MirrorError::invalid_input("blank entry name"))
        }

        fn subscribe_changes(&self, _callback: ChangeCallback) -> crate::Result<()> {
            Ok(())
        }

        fn unsubscribe(&self) {}
    }

    #[derive(Default)]
    struct Failures {
        recoverable: Mutex<Vec<bool>>,
        reported: Condvar,
    }

    impl Presenter for Failures {
        fn on_delta(&self, _added: &[Entry], _removed: &[Entry]) {}

        fn on_scan_complete(&self, _elapsed: Duration) {}

        fn on_scan_failed(&self, error: &MirrorError) {
            self.recoverable.lock().push(error.is_recoverable());
            self.reported.notify_all();
        }
    }

    #[test]
    fn unrecoverable_scan_error_leaves_the_watcher_usable() {
        let presenter = Arc::new(Failures::default());
        let watcher = FolderWatcher::start(
            Arc::new(RejectsInput),
            presenter.clone(),
            NaturalComparator::with_separators(NumberSeparators::POINT_COMMA),
            WatcherConfig::default(),
        )
        .unwrap();

        {
            let mut seen = presenter.recoverable.lock();
            while seen.is_empty() {
                assert!(!presenter.reported.wait_for(&mut seen, WAIT).timed_out(), "scan never failed");
            }
            assert_eq!(*seen, vec![false]);
        }
        assert_eq!(watcher.stats().scans_failed, 1);
        assert_eq!(watcher.state(), WatcherState::Idle);
        assert!(watcher.rescan());
    }

    /// Drops the watcher it holds from inside `on_scan_complete`.
    #[derive(Default)]
    struct DropsWatcher {
        slot: Mutex<Option<FolderWatcher>>,
        filled: Condvar,
        states: Mutex<Vec<WatcherState>>,
        reported: Condvar,
    }

    impl Presenter for DropsWatcher {
        fn on_delta(&self, _added: &[Entry], _removed: &[Entry]) {}

        fn on_scan_complete(&self, _elapsed: Duration) {
            let mut slot = self.slot.lock();
            while slot.is_none() {
                if self.filled.wait_for(&mut slot, WAIT).timed_out() {
                    return;
                }
            }
            let Some(watcher) = slot.take() else { return };
            drop(slot);

            let shared = Arc::clone(&watcher.shared);
            drop(watcher);
            self.states.lock().push(*shared.state.lock());
            self.reported.notify_all();
        }
    }

    #[test]
    fn dropping_the_watcher_from_a_callback_marks_it_cancelled() {
        let presenter = Arc::new(DropsWatcher::default());
        let watcher = FolderWatcher::start(
            Arc::new(OneFile),
            presenter.clone(),
            NaturalComparator::with_separators(NumberSeparators::POINT_COMMA),
            WatcherConfig::default(),
        )
        .unwrap();
        *presenter.slot.lock() = Some(watcher);
        presenter.filled.notify_all();

        let mut states = presenter.states.lock();
        while states.is_empty() {
            assert!(!presenter.reported.wait_for(&mut states, WAIT).timed_out(), "callback never ran");
        }
        assert_eq!(*states, vec![WatcherState::Cancelled]);
    }
}
