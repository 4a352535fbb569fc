use std::str::FromStr;

use crate::error::MirrorError;

/// Entries requested from the backend per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

const PAGE_SIZE_VAR: &str = "FOLDER_MIRROR_PAGE_SIZE";
const DELIVERY_VAR: &str = "FOLDER_MIRROR_DELIVERY";

/// When the presenter sees the delta batches of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaDelivery {
    /// Hold batches until the scan completes and its list is committed. An
    /// aborted scan delivers nothing, so the presenter always mirrors a
    /// committed list.
    #[default]
    Buffered,
    /// Deliver each page's batch as soon as it is reconciled.
    ///
    /// If the scan later fails or is cancelled, batches already delivered are
    /// not retracted while the committed list stays unchanged. The presenter
    /// and [`FolderWatcher::entries`](super::FolderWatcher::entries) disagree
    /// until the next successful scan.
    Streaming,
}

impl FromStr for DeltaDelivery {
    type Err = MirrorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buffered" => Ok(Self::Buffered),
            "streaming" => Ok(Self::Streaming),
            other => Err(MirrorError::invalid_input(format!("unknown delta delivery {other:?}"))),
        }
    }
}

/// Tuning for one [`FolderWatcher`](super::FolderWatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Entries requested per `enumerate` call. Must be at least 1.
    pub page_size: usize,
    pub delivery: DeltaDelivery,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, delivery: DeltaDelivery::default() }
    }
}

impl WatcherConfig {
    /// Request `page_size` entries per page. Checked by [`validate`](Self::validate).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Choose when the presenter sees delta batches.
    pub fn with_delivery(mut self, delivery: DeltaDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Fails with [`MirrorError::InvalidInput`] when the page size is 0.
    pub fn validate(&self) -> crate::Result<()> {
        if self.page_size == 0 {
            return Err(MirrorError::invalid_input("page size must be at least 1"));
        }
        Ok(())
    }

    /// Defaults overridden by `FOLDER_MIRROR_PAGE_SIZE` and `FOLDER_MIRROR_DELIVERY`.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(PAGE_SIZE_VAR).filter(|v| !v.trim().is_empty()) {
            config.page_size = raw
                .trim()
                .parse()
                .map_err(|_| MirrorError::invalid_input(format!("{PAGE_SIZE_VAR} is not a number: {raw:?}")))?;
        }
        if let Some(raw) = lookup(DELIVERY_VAR).filter(|v| !v.trim().is_empty()) {
            config.delivery = raw.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}
