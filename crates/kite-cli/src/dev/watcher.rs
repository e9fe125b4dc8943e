//! File system watcher with per-file debouncing.
//!
//! Watches the whole project root. Raw notify events are filtered, held until
//! the file has been quiet for the debounce window and then handed on as
//! [`FileChange`]s keyed by module id. Editors that save in several steps
//! (truncate, write, chmod) produce one change.

use crate::error::{CliError, Result};
use kite_hmr::{FileChange, ModuleId};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// What happened to a path, before debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeKind::Removed),
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            EventKind::Remove(_) => Some(ChangeKind::Removed),
            _ => None,
        }
    }

    fn into_change(self, id: ModuleId) -> FileChange {
        match self {
            ChangeKind::Created => FileChange::Created(id),
            ChangeKind::Modified => FileChange::Modified(id),
            ChangeKind::Removed => FileChange::Removed(id),
        }
    }
}

/// Trailing-edge debouncer keyed by path.
///
/// A path is released once no event for it arrived for `window`. Repeated
/// events coalesce into one and the last kind wins.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: FxHashMap<PathBuf, (ChangeKind, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: FxHashMap::default(),
        }
    }

    pub fn push(&mut self, path: PathBuf, kind: ChangeKind, now: Instant) {
        self.pending.insert(path, (kind, now));
    }

    /// Remove and return every path that has been quiet for the window, sorted.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<(PathBuf, ChangeKind)> {
        let window = self.window;
        let mut ready: Vec<(PathBuf, ChangeKind)> = self
            .pending
            .iter()
            .filter(|(_, (_, last))| now.saturating_duration_since(*last) >= window)
            .map(|(path, (kind, _))| (path.clone(), *kind))
            .collect();

        for (path, _) in &ready {
            self.pending.remove(path);
        }
        ready.sort_by(|a, b| a.0.cmp(&b.0));
        ready
    }

    /// When the earliest pending path becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|(_, last)| *last + self.window)
            .min()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root` and stream debounced changes.
    ///
    /// Must be called from within a tokio runtime; the debounce loop runs as a
    /// task that ends when the watcher is dropped.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(100);

        let filter_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    debug!(error = %err, "watch error");
                    return;
                }
            };
            let Some(kind) = ChangeKind::from_event(&event.kind) else {
                return;
            };
            for path in event.paths {
                if should_ignore(&path, &filter_root, &ignore_patterns) {
                    continue;
                }
                if kind != ChangeKind::Removed && path.is_dir() {
                    continue;
                }
                let _ = raw_tx.send((path, kind));
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        tokio::spawn(debounce_loop(
            raw_rx,
            tx,
            root.clone(),
            Duration::from_millis(debounce_ms),
        ));

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Hold raw events until each path is quiet, then emit module changes.
async fn debounce_loop(
    mut raw_rx: mpsc::UnboundedReceiver<(PathBuf, ChangeKind)>,
    tx: mpsc::Sender<FileChange>,
    root: PathBuf,
    window: Duration,
) {
    let mut debouncer = Debouncer::new(window);

    loop {
        let wait = debouncer
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));

        tokio::select! {
            event = raw_rx.recv() => match event {
                Some((path, kind)) => {
                    trace!(path = %path.display(), ?kind, "raw change");
                    debouncer.push(path, kind, Instant::now());
                }
                None if debouncer.is_empty() => break,
                None => tokio::time::sleep(window).await,
            },
            _ = tokio::time::sleep(wait.unwrap_or(window)), if wait.is_some() => {}
        }

        for (path, kind) in debouncer.drain_ready(Instant::now()) {
            let id = match ModuleId::from_fs_path(&root, &path) {
                Ok(id) => id,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping change");
                    continue;
                }
            };
            if tx.send(kind.into_change(id)).await.is_err() {
                return;
            }
        }
    }
}

/// Whether a watcher path should be dropped before debouncing.
///
/// Paths outside the root, hidden files and directories, `*.ext` patterns and
/// directory-name patterns are ignored.
pub fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };

    let path_str = rel_path.to_string_lossy();

    for pattern in ignore_patterns {
        if let Some(ext) = pattern.strip_prefix('*') {
            if path_str.ends_with(ext) {
                return true;
            }
        } else if rel_path
            .components()
            .any(|component| component.as_os_str() == pattern.as_str())
        {
            return true;
        }
    }

    rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    })
}
