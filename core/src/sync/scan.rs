use std::time::{Duration, Instant};

use tracing::debug;

use crate::cancel::CancellationToken;
use crate::error::MirrorError;
use crate::natural::NaturalComparator;
use crate::ports::FolderBackend;
use crate::types::Entry;

use super::merge::{DeltaBatch, Reconciled, Reconciler};

/// Counters for one completed scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub pages: usize,
    pub items_seen: usize,
    pub added: usize,
    pub removed: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct ScanOutcome {
    /// The new authoritative list. Only valid because the scan ran to completion.
    pub entries: Vec<Entry>,
    pub report: ScanReport,
}

/// Page through `backend` and reconcile against `previous`.
///
/// Every non-empty page batch, then the trailing removal batch, is handed to
/// `sink` in order. Cancellation is checked before each page fetch, between
/// items, and before each batch is handed over. Any error means the caller
/// must not commit `previous`'s replacement.
pub fn run_scan(
    backend: &dyn FolderBackend,
    comparator: &NaturalComparator,
    previous: Vec<Entry>,
    page_size: usize,
    cancel: &CancellationToken,
    mut sink: impl FnMut(DeltaBatch<Entry>),
) -> crate::Result<ScanOutcome> {
    if page_size == 0 {
        return Err(MirrorError::invalid_input("page size must be at least 1"));
    }

    let started = Instant::now();
    let mut reconciler = Reconciler::new(previous, |a: &Entry, b: &Entry| comparator.compare_entries(a, b));
    let mut report = ScanReport::default();
    let mut start = 0usize;

    loop {
        cancel.check()?;
        let page = backend.enumerate(start, page_size).map_err(|err| match err {
            MirrorError::BackendFailure { .. } | MirrorError::Cancelled => err,
            other => MirrorError::backend_with(format!("enumerating from offset {start}"), other),
        })?;
        if page.is_empty() {
            break;
        }

        let fetched = page.len();
        let batch = reconciler.reconcile_page(page, cancel)?;
        cancel.check()?;

        report.pages += 1;
        report.items_seen += fetched;
        report.added += batch.added.len();
        report.removed += batch.removed.len();
        debug!(
            target: "sync",
            page = report.pages,
            start,
            fetched,
            added = batch.added.len(),
            removed = batch.removed.len(),
            "page reconciled"
        );

        if !batch.is_empty() {
            sink(batch);
        }
        start += fetched;
    }

    let Reconciled { entries, trailing } = reconciler.finish();
    cancel.check()?;
    if !trailing.is_empty() {
        report.removed += trailing.removed.len();
        debug!(target: "sync", removed = trailing.removed.len(), "trailing entries removed");
        sink(trailing);
    }

    report.elapsed = started.elapsed();
    Ok(ScanOutcome { entries, report })
}
