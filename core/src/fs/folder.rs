//! A [`FolderBackend`] over a directory on the local file system.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::MirrorError;
use crate::natural::NaturalComparator;
use crate::ports::{ChangeCallback, FolderBackend};
use crate::types::{Entry, EntryKind, EntryMetadata};

use super::util;

/// Which directory entries a [`LocalFolder`] reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalFolderOptions {
    /// Report dot-files and dot-folders.
    pub include_hidden: bool,
    /// Only report files with these extensions (lowercase, no dot). Empty means all files.
    /// Folders are always reported.
    pub extensions: Vec<String>,
}

impl LocalFolderOptions {
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| util::normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    fn accepts(&self, name: &str, kind: EntryKind) -> bool {
        if !self.include_hidden && util::is_hidden(name) {
            return false;
        }
        kind.is_folder() || util::has_extension(name, &self.extensions)
    }
}

/// Directory listing served in pages.
///
/// The directory is read once per enumeration pass, when page `0` is
/// requested; later pages are cut from that sorted snapshot so a pass sees one
/// consistent listing.
pub struct LocalFolder {
    root: PathBuf,
    comparator: NaturalComparator,
    options: LocalFolderOptions,
    snapshot: Mutex<Option<Arc<Vec<Entry>>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl LocalFolder {
    /// Fails with [`MirrorError::Io`] when `root` cannot be inspected and
    /// [`MirrorError::InvalidInput`] when it is not a directory.
    pub fn open(
        root: impl Into<PathBuf>,
        comparator: NaturalComparator,
        options: LocalFolderOptions,
    ) -> crate::Result<Self> {
        let root = root.into();
        let meta = fs::metadata(&root)
            .map_err(|err| MirrorError::io(format!("inspecting folder {}", root.display()), err))?;
        if !meta.is_dir() {
            return Err(MirrorError::invalid_input(format!("{} is not a directory", root.display())));
        }

        Ok(Self { root, comparator, options, snapshot: Mutex::new(None), watcher: Mutex::new(None) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &LocalFolderOptions {
        &self.options
    }

    /// Read the directory now and return its entries in entry order.
    pub fn read_entries(&self) -> crate::Result<Vec<Entry>> {
        let listing = fs::read_dir(&self.root).map_err(|err| {
            MirrorError::backend_with(format!("reading folder {}", self.root.display()), err)
        })?;

        let mut entries = Vec::new();
        for item in listing {
            let item = item.map_err(|err| {
                MirrorError::backend_with(format!("reading folder {}", self.root.display()), err)
            })?;
            if let Some(entry) = self.to_entry(&item) {
                entries.push(entry);
            }
        }

        self.comparator.sort_entries(&mut entries);
        Ok(entries)
    }

    fn to_entry(&self, item: &fs::DirEntry) -> Option<Entry> {
        let Ok(name) = item.file_name().into_string() else {
            warn!(target: "fs", path = %item.path().display(), "skipping entry with a non UTF-8 name");
            return None;
        };

        // Follows symlinks; dangling links vanish from the listing.
        let meta = match fs::metadata(item.path()) {
            Ok(meta) => meta,
            Err(err) => {
                debug!(target: "fs", %name, error = %err, "skipping unreadable entry");
                return None;
            }
        };
        let kind = if meta.is_dir() { EntryKind::Folder } else { EntryKind::File };
        if !self.options.accepts(&name, kind) {
            return None;
        }

        let modified = meta.modified().ok();
        let created_at = meta.created().ok().or(modified).unwrap_or(SystemTime::UNIX_EPOCH);
        let metadata = EntryMetadata {
            modified,
            size: (kind == EntryKind::File).then_some(meta.len()),
            item_date: None,
        };

        match Entry::new(name, kind, created_at) {
            Ok(entry) => Some(entry.with_metadata(metadata)),
            Err(err) => {
                debug!(target: "fs", error = %err, "skipping entry");
                None
            }
        }
    }

    fn pass_snapshot(&self, start: usize) -> crate::Result<Arc<Vec<Entry>>> {
        let mut snapshot = self.snapshot.lock();
        if start == 0 || snapshot.is_none() {
            let fresh = Arc::new(self.read_entries()?);
            debug!(target: "fs", folder = %self.root.display(), entries = fresh.len(), "folder listing refreshed");
            *snapshot = Some(Arc::clone(&fresh));
            return Ok(fresh);
        }
        snapshot.clone().ok_or_else(|| MirrorError::backend("folder listing missing"))
    }
}

impl FolderBackend for LocalFolder {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn enumerate(&self, start: usize, page_size: usize) -> crate::Result<Vec<Entry>> {
        let listing = self.pass_snapshot(start)?;
        Ok(listing.iter().skip(start).take(page_size).cloned().collect())
    }

    fn subscribe_changes(&self, callback: ChangeCallback) -> crate::Result<()> {
        let root = self.root.clone();
        let mut watcher = recommended_watcher(move |event: notify::Result<Event>| match event {
            Ok(event) if matches!(event.kind, EventKind::Access(_)) => {}
            Ok(_) => callback(),
            Err(err) => {
                // The listing may have changed without a proper event; rescan to be sure.
                warn!(target: "fs", folder = %root.display(), error = %err, "folder watch error");
                callback();
            }
        })
        .map_err(|err| MirrorError::backend_with(format!("creating watcher for {}", self.root.display()), err))?;

        watcher
            .watch(&self.root, RecursiveMode::NonRecursive)
            .map_err(|err| MirrorError::backend_with(format!("watching {}", self.root.display()), err))?;

        *self.watcher.lock() = Some(watcher);
        debug!(target: "fs", folder = %self.root.display(), "watching folder");
        Ok(())
    }

    fn unsubscribe(&self) {
        if self.watcher.lock().take().is_some() {
            debug!(target: "fs", folder = %self.root.display(), "stopped watching folder");
        }
    }
}

impl fmt::Debug for LocalFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFolder")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("watching", &self.watcher.lock().is_some())
            .finish_non_exhaustive()
    }
}
