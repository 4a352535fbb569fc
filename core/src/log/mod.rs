//! Tracing setup for hosts running a folder watcher.
//!
//! The crate reports under four targets: `watcher` (scan lifecycle), `sync`
//! (page progress), `fs` (local folder listing and watch handles) and
//! `natural` (comparator fallbacks). [`LogConfig::default`] keeps those at
//! info, `natural` at warn, and everything else, including `notify`, at warn.
//! `notify` reports through the `log` crate, so its records are bridged into
//! `tracing` and filtered by the same directives.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_log::AsLog;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Targets the crate emits events under.
pub const CRATE_TARGETS: [&str; 4] = ["watcher", "sync", "fs", "natural"];

/// Directives used when neither the config nor the environment supplies any.
pub const DEFAULT_DIRECTIVES: &str = "warn,watcher=info,sync=info,fs=info,natural=warn,notify=warn";

/// Checked in order; the first non-empty one replaces [`DEFAULT_DIRECTIVES`].
const DIRECTIVE_VARS: [&str; 2] = ["FOLDER_MIRROR_LOG", "RUST_LOG"];

static LOG_HANDLE: OnceLock<LogHandle> = OnceLock::new();

/// Where and how much the watcher logs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory holding the log files. Created on demand.
    pub directory: PathBuf,
    /// File name prefix; files are named `<prefix>[.<date>].log`.
    pub file_prefix: String,
    /// How often a new file is started.
    pub rotation: Rotation,
    /// Log files to keep when starting up. `None` keeps everything.
    pub retention: Option<usize>,
    /// `EnvFilter` directives shared by the file and console sinks.
    pub directives: String,
    /// Ceiling for the stderr sink on top of `directives`. `OFF` silences it.
    pub console_level: LevelFilter,
    /// Forward `log` records (`notify` uses `log`) into `tracing`.
    pub bridge_log: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: "mirror".to_string(),
            rotation: Rotation::DAILY,
            retention: Some(7),
            directives: directives_from_env().unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string()),
            console_level: if cfg!(debug_assertions) { LevelFilter::INFO } else { LevelFilter::WARN },
            bridge_log: true,
        }
    }
}

impl LogConfig {
    /// Write log files under `path` instead of the per-user data directory.
    pub fn with_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.directory = path.into();
        self
    }

    /// Use `prefix` for log file names.
    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Replace the filter directives wholesale.
    pub fn with_directives<S: Into<String>>(mut self, directives: S) -> Self {
        self.directives = directives.into();
        self
    }

    /// Override the level of one target, e.g. `("sync", LevelFilter::DEBUG)` to trace pages.
    pub fn with_target_level(mut self, target: &str, level: LevelFilter) -> Self {
        if !self.directives.trim().is_empty() {
            self.directives.push(',');
        }
        self.directives.push_str(&format!("{target}={level}"));
        self
    }

    /// Cap the stderr sink.
    pub fn with_console_level(mut self, level: LevelFilter) -> Self {
        self.console_level = level;
        self
    }

    /// Change how often a new file is started.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Keeps the background file writer alive. Dropping it flushes pending lines.
#[derive(Debug)]
pub struct LogHandle {
    _guard: WorkerGuard,
    directory: PathBuf,
    directives: String,
}

impl LogHandle {
    /// Directory the file sink writes to.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Filter directives the subscriber was built with.
    pub fn directives(&self) -> &str {
        &self.directives
    }
}

/// Install the global subscriber, or return the handle of an earlier call.
///
/// Later calls ignore their `config`.
pub fn init(config: LogConfig) -> Result<&'static LogHandle> {
    if let Some(handle) = LOG_HANDLE.get() {
        return Ok(handle);
    }

    let (subscriber, handle) = build(&config)?;
    if config.bridge_log {
        let ceiling = EnvFilter::try_new(&config.directives)
            .ok()
            .and_then(|filter| filter.max_level_hint())
            .unwrap_or(LevelFilter::WARN);
        // Another logger may already own `log`; keep it in that case.
        let _ = tracing_log::LogTracer::builder().with_max_level(ceiling.as_log()).init();
    }
    subscriber.try_init().context("installing global tracing subscriber")?;

    let _ = LOG_HANDLE.set(handle);
    LOG_HANDLE.get().context("log handle missing after initialisation")
}

/// Build the subscriber without installing it.
///
/// Useful for scoping output with `tracing::subscriber::with_default`.
pub fn build(config: &LogConfig) -> Result<(impl Subscriber + Send + Sync + 'static, LogHandle)> {
    fs::create_dir_all(&config.directory)
        .with_context(|| format!("creating log directory at {}", config.directory.display()))?;

    if let Some(keep) = config.retention.filter(|keep| *keep > 0) {
        prune_old_logs(&config.directory, &config.file_prefix, keep).context("applying log retention")?;
    }

    let appender = tracing_appender::rolling::Builder::new()
        .rotation(config.rotation.clone())
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .context("creating rolling log appender")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(&config.directives)
        .with_context(|| format!("parsing log directives {:?}", config.directives))?;

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_thread_names(true).with_writer(file_writer))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(config.console_level));

    let handle =
        LogHandle { _guard: guard, directory: config.directory.clone(), directives: config.directives.clone() };
    Ok((subscriber, handle))
}

fn directives_from_env() -> Option<String> {
    DIRECTIVE_VARS.iter().filter_map(|var| std::env::var(var).ok()).find(|value| !value.trim().is_empty())
}

/// Delete all but the `keep` most recently modified `<prefix>*.log` files.
fn prune_old_logs(dir: &Path, prefix: &str, keep: usize) -> Result<()> {
    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for item in fs::read_dir(dir).with_context(|| format!("reading log directory {}", dir.display()))? {
        let Ok(item) = item else { continue };
        let name = item.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(prefix) || !name.ends_with(".log") {
            continue;
        }
        let Ok(meta) = item.metadata() else { continue };
        if meta.is_file() {
            logs.push((meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), item.path()));
        }
    }

    logs.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, stale) in logs.into_iter().skip(keep) {
        let _ = fs::remove_file(stale);
    }
    Ok(())
}

fn default_log_directory() -> PathBuf {
    match directories::ProjectDirs::from("org", "FolderMirror", "folder-mirror") {
        Some(dirs) => dirs.data_local_dir().join("logs"),
        None => std::env::temp_dir().join("folder-mirror-logs"),
    }
}
