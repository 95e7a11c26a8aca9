use crate::config::AppConfig;
use crate::engine::{ScanEngine, Scheduler};
use crate::error::Error;
use crate::platform;
use crate::status::ScanStatus;
use crate::storage::{Database, FileRecord};
use crate::watcher::LiveWatcher;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{error, info};

/// The wiring the API layer talks to: one store, one engine, and optionally
/// a scheduler plus a live watcher when running as a daemon.
pub struct IndexService {
    config: AppConfig,
    db: Arc<Mutex<Database>>,
    engine: Arc<ScanEngine>,
    scheduler: Option<Scheduler>,
    watcher: Option<LiveWatcher>,
}

impl IndexService {
    pub fn open(config: AppConfig) -> Result<Self, Error> {
        let db = Database::open(&config.db_path)?;
        Self::with_database(config, db)
    }

    pub fn with_database(config: AppConfig, db: Database) -> Result<Self, Error> {
        let db = Arc::new(Mutex::new(db));
        let engine = Arc::new(ScanEngine::new(Arc::clone(&db), &config)?);
        Ok(Self {
            config,
            db,
            engine,
            scheduler: None,
            watcher: None,
        })
    }

    pub fn engine(&self) -> &Arc<ScanEngine> {
        &self.engine
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Daemon mode: start the live watcher over every monitored root and the
    /// scheduling loop (which runs an immediate first pass).
    pub fn start(&mut self) -> Result<(), Error> {
        if self.watcher.is_none() {
            let watcher = LiveWatcher::start(Arc::clone(&self.engine))?;
            for root in self.db().list_monitored_directories()? {
                if let Err(err) = watcher.watch(Path::new(&root)) {
                    error!("Failed to watch {}: {}", root, err);
                }
            }
            self.watcher = Some(watcher);
        }
        if self.scheduler.is_none() {
            self.scheduler = Some(Scheduler::start(
                Arc::clone(&self.engine),
                Duration::from_secs(self.config.scan_interval_secs),
            ));
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
    }

    /// Run a pass on the calling thread. Returns false when one was already
    /// in progress.
    pub fn run_pass_now(&self) -> bool {
        self.engine.perform_scan()
    }

    /// Coalesced trigger: queued on the scheduler when running as a daemon,
    /// otherwise executed inline.
    pub fn trigger_manual_pass(&self) {
        match &self.scheduler {
            Some(scheduler) => scheduler.trigger_manual_scan(),
            None => {
                self.engine.perform_scan();
            }
        }
    }

    pub fn status(&self) -> ScanStatus {
        self.engine.status()
    }

    pub fn lookup_by_fingerprint(&self, fingerprint: &str) -> Result<Option<FileRecord>, Error> {
        Ok(self.db().get_by_fingerprint(fingerprint)?)
    }

    pub fn lookup_by_path(&self, path: &str) -> Result<Option<FileRecord>, Error> {
        Ok(self.db().get_by_path(path)?)
    }

    /// Paged listing, newest first, with optional substring search.
    pub fn list_files(
        &self,
        search: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<FileRecord>, i64), Error> {
        let page = page.max(1);
        let page_size = if page_size < 1 { 20 } else { page_size };
        let offset = (page - 1) * page_size;
        Ok(self.db().list_files(search, offset, page_size)?)
    }

    pub fn indexed_file_count(&self) -> Result<i64, Error> {
        Ok(self.db().count_files()?)
    }

    /// Register a root, start watching it, and kick off a pass to index it.
    pub fn add_directory(&self, path: &str) -> Result<(), Error> {
        let added = self.db().add_monitored_directory(path)?;
        if !added {
            info!("{} is already monitored", path);
            return Ok(());
        }
        if let Some(watcher) = &self.watcher {
            if let Err(err) = watcher.watch(Path::new(path)) {
                error!("Failed to watch {}: {}", path, err);
            }
        }
        self.trigger_manual_pass();
        Ok(())
    }

    /// Unregister a root: unwatch it and drop every record under it.
    /// Idempotent: removing an unknown root is a no-op. Returns the number
    /// of records dropped.
    pub fn remove_directory(&self, path: &str) -> Result<usize, Error> {
        let removed = self.db().remove_monitored_directory(path)?;
        if let Some(watcher) = &self.watcher {
            watcher.unwatch(Path::new(path));
        }
        Ok(removed)
    }

    pub fn monitored_directories(&self) -> Result<Vec<String>, Error> {
        Ok(self.db().list_monitored_directories()?)
    }

    pub fn ignore_patterns(&self) -> Result<Vec<String>, Error> {
        Ok(self.db().ignore_patterns()?)
    }

    pub fn set_ignore_patterns(&self, patterns: &[String]) -> Result<(), Error> {
        Ok(self.db().set_ignore_patterns(patterns)?)
    }

    /// Locate an indexed file in the native file browser. Returns the path
    /// that was revealed, or None when the fingerprint is unknown.
    pub fn reveal(&self, fingerprint: &str) -> Result<Option<String>, Error> {
        match self.db().get_by_fingerprint(fingerprint)? {
            Some(record) => {
                platform::reveal_in_file_browser(Path::new(&record.path))?;
                Ok(Some(record.path))
            }
            None => Ok(None),
        }
    }
}

impl Drop for IndexService {
    fn drop(&mut self) {
        self.stop();
    }
}
