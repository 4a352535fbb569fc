//! Sorted merge-diff between a previous list and a freshly enumerated one.
//!
//! The previous list is consumed once, front to back, through a single cursor
//! that survives page boundaries. The new list is built fresh; nothing is
//! inserted into or removed from a live list while it is traversed.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::vec;

use crate::cancel::CancellationToken;
use crate::error::MirrorError;

/// Added and removed items produced for one page, or for the trailing removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaBatch<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> DeltaBatch<T> {
    pub fn new() -> Self {
        Self { added: Vec::new(), removed: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// Append another batch, keeping emission order.
    pub fn extend(&mut self, other: DeltaBatch<T>) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
    }
}

impl<T> Default for DeltaBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a completed reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled<T> {
    /// The merged list, sorted and free of duplicate identities.
    pub entries: Vec<T>,
    /// Previous items past the final cursor position; they no longer exist.
    pub trailing: DeltaBatch<T>,
}

enum Step {
    Keep,
    KeepExisting,
    Add,
}

/// Incremental merge of a sorted previous list against a sorted, paged new list.
///
/// Identity is `T: PartialEq`; order is the `order` function. Both must agree:
/// identity-equal items compare `Equal`. Items that compare `Equal` without
/// being identity-equal keep the previous item and drop the incoming one.
pub struct Reconciler<T, F> {
    existing: Peekable<vec::IntoIter<T>>,
    merged: Vec<T>,
    order: F,
    seen: usize,
}

impl<T, F> Reconciler<T, F>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> Ordering,
{
    pub fn new(existing: Vec<T>, order: F) -> Self {
        let capacity = existing.len();
        Self {
            existing: existing.into_iter().peekable(),
            merged: Vec::with_capacity(capacity),
            order,
            seen: 0,
        }
    }

    /// Reconcile one page of the new sequence and return its delta batch.
    ///
    /// Cancellation is checked before every item. On error the reconciler must
    /// be discarded.
    pub fn reconcile_page<I>(&mut self, page: I, cancel: &CancellationToken) -> crate::Result<DeltaBatch<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut batch = DeltaBatch::new();
        for incoming in page {
            cancel.check()?;
            self.push(incoming, &mut batch)?;
        }
        Ok(batch)
    }

    fn push(&mut self, incoming: T, batch: &mut DeltaBatch<T>) -> crate::Result<()> {
        self.seen += 1;
        if let Some(last) = self.merged.last() {
            if (self.order)(last, &incoming) != Ordering::Less {
                return Err(MirrorError::backend(format!(
                    "entry #{} is out of order or duplicated in the enumeration",
                    self.seen
                )));
            }
        }

        let order = &self.order;
        while let Some(stale) = self.existing.next_if(|old| order(old, &incoming) == Ordering::Less) {
            batch.removed.push(stale);
        }

        let step = match self.existing.peek() {
            Some(old) if *old == incoming => Step::Keep,
            Some(old) if order(old, &incoming) == Ordering::Equal => Step::KeepExisting,
            _ => Step::Add,
        };

        match step {
            Step::Keep => {
                // The previous item may carry metadata populated since it was first seen.
                self.merged.extend(self.existing.next());
            }
            Step::KeepExisting => {
                tracing::debug!(target: "sync", position = self.seen, "order-equal entry kept as is");
                self.merged.extend(self.existing.next());
            }
            Step::Add => {
                batch.added.push(incoming.clone());
                self.merged.push(incoming);
            }
        }
        Ok(())
    }

    /// Close the merge: every previous item not yet passed is removed.
    pub fn finish(self) -> Reconciled<T> {
        let removed: Vec<T> = self.existing.collect();
        let mut entries = self.merged;
        entries.shrink_to_fit();
        Reconciled { entries, trailing: DeltaBatch { added: Vec::new(), removed } }
    }

    /// Incoming items consumed so far.
    pub fn seen(&self) -> usize {
        self.seen
    }
}

impl<T, F> fmt::Debug for Reconciler<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("merged", &self.merged.len())
            .field("seen", &self.seen)
            .finish_non_exhaustive()
    }
}

/// One-shot reconciliation of two complete sorted lists.
///
/// Returns the merged list and a single batch holding every change.
pub fn reconcile<T, F>(existing: Vec<T>, incoming: Vec<T>, order: F) -> crate::Result<(Vec<T>, DeltaBatch<T>)>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> Ordering,
{
    let mut reconciler = Reconciler::new(existing, order);
    let mut batch = reconciler.reconcile_page(incoming, &CancellationToken::new())?;
    let Reconciled { entries, trailing } = reconciler.finish();
    batch.extend(trailing);
    Ok((entries, batch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn run(old: &[&str], new: &[&str]) -> (Vec<String>, DeltaBatch<String>) {
        reconcile(strings(old), strings(new), |a: &String, b: &String| a.cmp(b)).unwrap()
    }

    #[test]
    fn appends_at_end() {
        let (merged, delta) = run(&["b", "c"], &["b", "c", "n"]);
        assert_eq!(merged, strings(&["b", "c", "n"]));
        assert_eq!(delta.added, strings(&["n"]));
        assert!(delta.removed.is_empty());
    }

    #[test]
    fn removes_at_start() {
        let (merged, delta) = run(&["a", "b", "c"], &["b", "c"]);
        assert_eq!(merged, strings(&["b", "c"]));
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, strings(&["a"]));
    }

    #[test]
    fn rename_in_the_middle() {
        let (merged, delta) = run(&["a", "b", "c"], &["a", "b0", "c"]);
        assert_eq!(merged, strings(&["a", "b0", "c"]));
        assert_eq!(delta.added, strings(&["b0"]));
        assert_eq!(delta.removed, strings(&["b"]));
    }

    #[test]
    fn trailing_items_are_removed_after_last_page() {
        let mut reconciler = Reconciler::new(strings(&["a", "b", "x", "y"]), |a: &String, b: &String| a.cmp(b));
        let cancel = CancellationToken::new();
        let first = reconciler.reconcile_page(strings(&["a"]), &cancel).unwrap();
        assert!(first.is_empty());
        let second = reconciler.reconcile_page(strings(&["c"]), &cancel).unwrap();
        assert_eq!(second.removed, strings(&["b"]));
        assert_eq!(second.added, strings(&["c"]));

        let done = reconciler.finish();
        assert_eq!(done.entries, strings(&["a", "c"]));
        assert_eq!(done.trailing.removed, strings(&["x", "y"]));
    }

    #[test]
    fn rejects_unsorted_or_duplicate_input() {
        let order = |a: &String, b: &String| a.cmp(b);
        let err = reconcile(Vec::new(), strings(&["b", "a"]), order).unwrap_err();
        assert!(matches!(err, MirrorError::BackendFailure { .. }));

        let err = reconcile(Vec::new(), strings(&["a", "a"]), order).unwrap_err();
        assert!(matches!(err, MirrorError::BackendFailure { .. }));
    }

    #[test]
    fn cancellation_stops_mid_page() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut reconciler = Reconciler::new(strings(&["a"]), |a: &String, b: &String| a.cmp(b));
        let err = reconciler.reconcile_page(strings(&["a", "b"]), &cancel).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(reconciler.seen(), 0);
    }

    #[test]
    fn order_equal_items_keep_the_previous_one() {
        let order = |a: &String, b: &String| a.to_lowercase().cmp(&b.to_lowercase());
        let (merged, delta) = reconcile(strings(&["Alpha"]), strings(&["alpha"]), order).unwrap();
        assert_eq!(merged, strings(&["Alpha"]));
        assert!(delta.is_empty());
    }
}
