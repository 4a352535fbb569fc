//! Shared data structures exchanged between backends, the sync engine, and presenters.

use std::hash::{Hash, Hasher};
use std::time::SystemTime;

use crate::error::MirrorError;

/// Whether an entry is a folder or a file. Folders sort before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Folder,
    File,
}

impl EntryKind {
    pub fn is_folder(self) -> bool {
        matches!(self, EntryKind::Folder)
    }
}

/// Details filled in after an entry is known. Never used for ordering or identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryMetadata {
    pub modified: Option<SystemTime>,
    pub size: Option<u64>,
    pub item_date: Option<SystemTime>,
}

impl EntryMetadata {
    /// True once any field has been populated.
    pub fn is_populated(&self) -> bool {
        self.modified.is_some() || self.size.is_some() || self.item_date.is_some()
    }
}

/// One item in the mirrored folder.
///
/// Equality and hashing follow identity: two entries are the same item when
/// `name` (case-sensitive) and `kind` match. Ordering needs a
/// [`NaturalComparator`](crate::natural::NaturalComparator) and lives there.
#[derive(Debug, Clone)]
pub struct Entry {
    name: String,
    kind: EntryKind,
    created_at: SystemTime,
    pub metadata: EntryMetadata,
}

impl Entry {
    /// Builds an entry, rejecting names that are empty once trimmed.
    pub fn new(name: impl Into<String>, kind: EntryKind, created_at: SystemTime) -> crate::Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MirrorError::invalid_input(format!("entry name {name:?} is empty")));
        }
        Ok(Self { name, kind, created_at, metadata: EntryMetadata::default() })
    }

    pub fn folder(name: impl Into<String>) -> crate::Result<Self> {
        Self::new(name, EntryKind::Folder, SystemTime::UNIX_EPOCH)
    }

    pub fn file(name: impl Into<String>) -> crate::Result<Self> {
        Self::new(name, EntryKind::File, SystemTime::UNIX_EPOCH)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn with_metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Identity check, spelled out for call sites where `==` would read ambiguously.
    pub fn same_item(&self, other: &Entry) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.same_item(other)
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn identity_ignores_timestamps_and_metadata() {
        let early = Entry::new("Report.pdf", EntryKind::File, SystemTime::UNIX_EPOCH).unwrap();
        let late = Entry::new("Report.pdf", EntryKind::File, SystemTime::UNIX_EPOCH + Duration::from_secs(60))
            .unwrap()
            .with_metadata(EntryMetadata { size: Some(12), ..Default::default() });

        assert_eq!(early, late);
        let set: HashSet<Entry> = [early, late].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn identity_is_case_sensitive_and_kind_aware() {
        assert_ne!(Entry::file("a").unwrap(), Entry::file("A").unwrap());
        assert_ne!(Entry::file("a").unwrap(), Entry::folder("a").unwrap());
    }

    #[test]
    fn rejects_blank_names() {
        assert!(matches!(Entry::file(""), Err(MirrorError::InvalidInput(_))));
        assert!(matches!(Entry::folder("  \t"), Err(MirrorError::InvalidInput(_))));
    }

    #[test]
    fn metadata_population_flag() {
        let mut entry = Entry::file("scan.png").unwrap();
        assert!(!entry.metadata.is_populated());
        entry.metadata.size = Some(4096);
        assert!(entry.metadata.is_populated());
    }
}
