//! Reconciliation of a cached sorted list against a fresh paged enumeration.

pub mod merge;
pub mod scan;

pub use merge::{DeltaBatch, Reconciled, Reconciler, reconcile};
pub use scan::{ScanOutcome, ScanReport, run_scan};
