use crate::engine::ScanEngine;
use crate::error::Error;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Bridges raw file-system notifications into the same index logic the
/// reconciliation passes use, keeping the index fresh between passes. Roots
/// are watched recursively, so subdirectories created after registration are
/// covered without re-subscription. The drain thread runs for the process
/// lifetime; event-stream errors are logged and never end the subscription.
pub struct LiveWatcher {
    watcher: Mutex<RecommendedWatcher>,
    _handle: JoinHandle<()>,
}

impl LiveWatcher {
    pub fn start(engine: Arc<ScanEngine>) -> Result<Self, Error> {
        let (tx, rx) = mpsc::channel::<Result<Event, notify::Error>>();
        let watcher = RecommendedWatcher::new(
            move |result| {
                let _ = tx.send(result);
            },
            Config::default(),
        )?;
        let handle = thread::spawn(move || {
            for result in rx {
                match result {
                    Ok(event) => apply_event(&engine, &event),
                    Err(err) => error!("Watcher error: {}", err),
                }
            }
        });
        Ok(Self {
            watcher: Mutex::new(watcher),
            _handle: handle,
        })
    }

    pub fn watch(&self, root: &Path) -> Result<(), Error> {
        self.lock().watch(root, RecursiveMode::Recursive)?;
        info!("Watching {}", root.display());
        Ok(())
    }

    /// Best effort; unwatching a path that was never watched is a no-op.
    pub fn unwatch(&self, root: &Path) {
        match self.lock().unwatch(root) {
            Ok(()) => info!("Stopped watching {}", root.display()),
            Err(err) => debug!("Failed to unwatch {}: {}", root.display(), err),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecommendedWatcher> {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map one notification onto the engine's single-path operations. Creations
/// and content modifications re-index; removals and rename-sources drop the
/// matching record. Paths whose state is ambiguous are reconciled against
/// the disk.
pub fn apply_event(engine: &ScanEngine, event: &Event) {
    match &event.kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                reconcile_path(engine, path);
            }
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in &event.paths {
                engine.remove_path(path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // Paths arrive ordered source, destination.
            if let [from, to] = event.paths.as_slice() {
                engine.remove_path(from);
                reconcile_path(engine, to);
            } else {
                for path in &event.paths {
                    reconcile_path(engine, path);
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            for path in &event.paths {
                reconcile_path(engine, path);
            }
        }
        // Access and metadata-only events carry no index-relevant change.
        _ => {}
    }
}

fn reconcile_path(engine: &ScanEngine, path: &Path) {
    if path.exists() {
        engine.index_path(path);
    } else {
        engine.remove_path(path);
    }
}
