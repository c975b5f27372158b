//! File system watcher for incremental reindexing
//!
//! Events stream from `notify` into a single-threaded loop that coalesces
//! them per path: the union of operation kinds seen during the window is
//! retained with the last timestamp. After a quiescence window with no new
//! events, the pending set drains into two lists: removed paths (any
//! Remove/Rename op) and changed paths (Write/Create, not removed). The
//! handler applies removals before updates.

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::models::is_ruby_file;

/// How often the event loop wakes to check the quiescence window
const POLL_INTERVAL_MS: u64 = 25;

/// Bitmask of filesystem operations accumulated for one path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOps(u8);

impl FileOps {
    pub const WRITE: FileOps = FileOps(1);
    pub const CREATE: FileOps = FileOps(1 << 1);
    pub const REMOVE: FileOps = FileOps(1 << 2);
    pub const RENAME: FileOps = FileOps(1 << 3);

    pub fn union(self, other: FileOps) -> FileOps {
        FileOps(self.0 | other.0)
    }

    pub fn has(self, op: FileOps) -> bool {
        self.0 & op.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Called with (changed, removed) path lists after each quiet window
pub type ChangeHandler = Box<dyn Fn(&[PathBuf], &[PathBuf]) + Send>;

/// Configuration for file watching
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Quiescence window in milliseconds: a drain happens only after this
    /// long with no new events
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

struct PendingChange {
    ops: FileOps,
    last_seen: Instant,
}

/// Coalesces file change events per path until a quiet window elapses
pub struct Debouncer {
    pending: HashMap<PathBuf, PendingChange>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    /// Record an event, merging with any pending ops for the same path
    pub fn record(&mut self, path: PathBuf, ops: FileOps) {
        self.record_at(path, ops, Instant::now());
    }

    fn record_at(&mut self, path: PathBuf, ops: FileOps, now: Instant) {
        self.pending
            .entry(path)
            .and_modify(|change| {
                change.ops = change.ops.union(ops);
                change.last_seen = now;
            })
            .or_insert(PendingChange {
                ops,
                last_seen: now,
            });
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain into (changed, removed) lists if the window has passed since
    /// the newest event; `None` while events are still arriving
    pub fn drain_if_quiet(&mut self, now: Instant) -> Option<(Vec<PathBuf>, Vec<PathBuf>)> {
        let newest = self.pending.values().map(|c| c.last_seen).max()?;
        if now.duration_since(newest) < self.window {
            return None;
        }
        Some(self.drain())
    }

    /// Split pending changes: Remove/Rename beats Write/Create for a path
    pub fn drain(&mut self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let mut changed = Vec::new();
        let mut removed = Vec::new();

        for (path, change) in self.pending.drain() {
            if change.ops.has(FileOps::REMOVE) || change.ops.has(FileOps::RENAME) {
                removed.push(path);
            } else if change.ops.has(FileOps::WRITE) || change.ops.has(FileOps::CREATE) {
                changed.push(path);
            }
        }

        changed.sort();
        removed.sort();
        (changed, removed)
    }
}

/// Watch a directory tree and feed debounced changes to the handler.
///
/// Blocks until the event channel disconnects.
pub fn watch(path: &Path, config: WatchConfig, handler: ChangeHandler) -> Result<()> {
    let (tx, rx) = channel();

    let mut watcher =
        RecommendedWatcher::new(tx, Config::default()).context("failed to create file watcher")?;

    watcher
        .watch(path, RecursiveMode::Recursive)
        .context("failed to start watching directory")?;

    log::info!(
        "file watcher started for {} ({}ms debounce)",
        path.display(),
        config.debounce_ms
    );

    run_event_loop(&rx, &config, handler);
    Ok(())
}

fn run_event_loop(
    rx: &Receiver<std::result::Result<Event, notify::Error>>,
    config: &WatchConfig,
    handler: ChangeHandler,
) {
    let mut debouncer = Debouncer::new(Duration::from_millis(config.debounce_ms));

    loop {
        match rx.recv_timeout(Duration::from_millis(POLL_INTERVAL_MS)) {
            Ok(Ok(event)) => {
                let ops = classify_event(&event);
                if ops.is_empty() {
                    continue;
                }

                for path in &event.paths {
                    if should_watch(path) {
                        log::debug!("detected change: {}", path.display());
                        debouncer.record(path.clone(), ops);
                    }
                }
            }
            Ok(Err(e)) => {
                log::warn!("watch error: {}", e);
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some((changed, removed)) = debouncer.drain_if_quiet(Instant::now()) {
                    if !changed.is_empty() || !removed.is_empty() {
                        log::info!(
                            "file changes: {} changed, {} removed",
                            changed.len(),
                            removed.len()
                        );
                        handler(&changed, &removed);
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("watcher channel disconnected, stopping");
                break;
            }
        }
    }
}

/// Map a notify event to the operation bitmask the debouncer tracks
fn classify_event(event: &Event) -> FileOps {
    match event.kind {
        EventKind::Create(_) => FileOps::CREATE,
        EventKind::Modify(ModifyKind::Name(_)) => FileOps::RENAME,
        EventKind::Modify(_) => FileOps::WRITE,
        EventKind::Remove(_) => FileOps::REMOVE,
        _ => FileOps::default(),
    }
}

/// Only Ruby files outside hidden/vendored directories trigger updates
fn should_watch(path: &Path) -> bool {
    if !is_ruby_file(path) {
        return false;
    }

    !path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        (name.starts_with('.') && name.len() > 1 && name != "..")
            || name == "vendor"
            || name == "node_modules"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};

    fn event(kind: EventKind, path: &str) -> Event {
        Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_classify_create() {
        let e = event(EventKind::Create(CreateKind::File), "/a.rb");
        assert!(classify_event(&e).has(FileOps::CREATE));
    }

    #[test]
    fn test_classify_write() {
        let e = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            "/a.rb",
        );
        assert!(classify_event(&e).has(FileOps::WRITE));
    }

    #[test]
    fn test_classify_rename() {
        let e = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            "/a.rb",
        );
        let ops = classify_event(&e);
        assert!(ops.has(FileOps::RENAME));
        assert!(!ops.has(FileOps::WRITE));
    }

    #[test]
    fn test_classify_remove() {
        let e = event(EventKind::Remove(RemoveKind::File), "/a.rb");
        assert!(classify_event(&e).has(FileOps::REMOVE));
    }

    #[test]
    fn test_classify_access_ignored() {
        let e = event(
            EventKind::Access(notify::event::AccessKind::Read),
            "/a.rb",
        );
        assert!(classify_event(&e).is_empty());
    }

    #[test]
    fn test_should_watch() {
        assert!(should_watch(Path::new("/app/models/user.rb")));
        assert!(should_watch(Path::new("/project/Gemfile")));

        assert!(!should_watch(Path::new("/app/readme.txt")));
        assert!(!should_watch(Path::new("/app/.hidden/user.rb")));
        assert!(!should_watch(Path::new("/app/vendor/gems/gem.rb")));
        assert!(!should_watch(Path::new("/app/node_modules/x/y.rb")));
    }

    #[test]
    fn test_debouncer_unions_ops_per_path() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();

        d.record_at(PathBuf::from("/a.rb"), FileOps::CREATE, t0);
        d.record_at(PathBuf::from("/a.rb"), FileOps::WRITE, t0);

        let (changed, removed) = d.drain();
        assert_eq!(changed, vec![PathBuf::from("/a.rb")]);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_debouncer_remove_wins_over_write() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();

        d.record_at(PathBuf::from("/a.rb"), FileOps::WRITE, t0);
        d.record_at(PathBuf::from("/a.rb"), FileOps::REMOVE, t0);

        let (changed, removed) = d.drain();
        assert!(changed.is_empty());
        assert_eq!(removed, vec![PathBuf::from("/a.rb")]);
    }

    #[test]
    fn test_debouncer_rename_counts_as_removed() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        d.record_at(PathBuf::from("/old.rb"), FileOps::RENAME, Instant::now());

        let (changed, removed) = d.drain();
        assert!(changed.is_empty());
        assert_eq!(removed, vec![PathBuf::from("/old.rb")]);
    }

    #[test]
    fn test_debouncer_waits_for_quiescence() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();

        d.record_at(PathBuf::from("/a.rb"), FileOps::WRITE, t0);

        // Still inside the window: nothing drains
        assert!(d.drain_if_quiet(t0 + Duration::from_millis(50)).is_none());

        // A fresh event extends the window
        d.record_at(PathBuf::from("/b.rb"), FileOps::WRITE, t0 + Duration::from_millis(80));
        assert!(d.drain_if_quiet(t0 + Duration::from_millis(120)).is_none());

        // Quiet long enough: both paths drain together
        let (changed, removed) = d
            .drain_if_quiet(t0 + Duration::from_millis(200))
            .expect("window elapsed");
        assert_eq!(changed.len(), 2);
        assert!(removed.is_empty());
        assert!(d.is_empty());
    }

    #[test]
    fn test_debouncer_drain_is_sorted() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();

        d.record_at(PathBuf::from("/b.rb"), FileOps::WRITE, t0);
        d.record_at(PathBuf::from("/a.rb"), FileOps::WRITE, t0);
        d.record_at(PathBuf::from("/c.rb"), FileOps::REMOVE, t0);

        let (changed, removed) = d.drain();
        assert_eq!(changed, vec![PathBuf::from("/a.rb"), PathBuf::from("/b.rb")]);
        assert_eq!(removed, vec![PathBuf::from("/c.rb")]);
    }

    #[test]
    fn test_empty_debouncer_never_drains() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        assert!(d.drain_if_quiet(Instant::now()).is_none());
    }
}
