use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::hasher::{self, FingerprintFn};
use crate::ignore::IgnoreSet;
use crate::status::{ScanCounters, ScanStatus};
use crate::storage::{Database, FileRecord};
use crate::walker;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, UNIX_EPOCH};
use tracing::{error, info, warn};

/// Runs reconciliation passes over the monitored roots: stale-mark, advisory
/// count, batched reconcile, cleanup. At most one pass runs at a time; late
/// triggers are dropped, not queued. The live watcher funnels its per-path
/// work through the same unit of work, so every store write from either side
/// serializes through the single database mutex.
pub struct ScanEngine {
    db: Arc<Mutex<Database>>,
    counters: ScanCounters,
    scanning: AtomicBool,
    fingerprint: FingerprintFn,
    batch_size: usize,
    pool: rayon::ThreadPool,
}

impl ScanEngine {
    pub fn new(db: Arc<Mutex<Database>>, config: &AppConfig) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_concurrency.max(1))
            .build()
            .map_err(|err| Error::Other(format!("Failed to build worker pool: {err}")))?;
        Ok(Self {
            db,
            counters: ScanCounters::default(),
            scanning: AtomicBool::new(false),
            fingerprint: hasher::default_fingerprint_fn(),
            batch_size: config.batch_size.max(1),
            pool,
        })
    }

    pub fn with_fingerprint_fn(mut self, fingerprint: FingerprintFn) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn status(&self) -> ScanStatus {
        self.counters.snapshot()
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempt one full reconciliation pass. Returns false when another pass
    /// is already running and the trigger was coalesced away.
    pub fn perform_scan(&self) -> bool {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Scan already in progress, dropping trigger");
            return false;
        }
        if let Err(err) = self.run_pass() {
            error!("Scan pass aborted: {}", err);
            self.counters.finish();
        }
        self.scanning.store(false, Ordering::SeqCst);
        true
    }

    fn run_pass(&self) -> Result<(), Error> {
        let pass_start = Instant::now();
        info!("Starting reconciliation pass");
        self.counters.begin();

        // Pass-level inputs. Failing to load either aborts the pass before
        // any index mutation.
        let monitored = self.db().list_monitored_directories()?;
        if monitored.is_empty() {
            info!("No monitored directories configured, skipping scan");
            self.counters.finish();
            return Ok(());
        }
        let patterns = self.db().ignore_patterns()?;
        let ignore = IgnoreSet::new(&patterns);
        let roots = config::non_overlapping_directories(monitored);

        // Stale-mark: every record must re-earn its seen flag this pass. An
        // unmarked row merely survives until the next pass, so a failure
        // here is logged rather than fatal.
        if let Err(err) = self.db().mark_all_stale() {
            error!("Failed to stale-mark records: {}", err);
        }

        // Advisory count walk, for progress reporting only.
        self.counters.set_current_dir("counting files");
        let mut total = 0i64;
        for root in &roots {
            total += walker::count_files(Path::new(root), &ignore) as i64;
        }
        self.counters.set_total(total);

        for root in &roots {
            self.counters.set_current_dir(root);
            self.scan_directory(Path::new(root), &ignore);
        }

        self.counters.set_current_dir("cleaning up");
        match self.db().delete_stale() {
            Ok(deleted) => self.counters.set_deleted(deleted as i64),
            Err(err) => error!("Failed to delete stale records: {}", err),
        }

        self.counters.finish();
        let status = self.counters.snapshot();
        info!(
            "Pass complete in {:.2}s — total: {}, processed: {}, skipped: {}, errors: {}, deleted: {}",
            pass_start.elapsed().as_secs_f64(),
            status.total_files,
            status.processed_files,
            status.skipped_files,
            status.error_files,
            status.deleted_files,
        );
        Ok(())
    }

    /// Enumerate one root depth-first, reconciling candidates in fixed-size
    /// batches. Batches run sequentially; files within a batch run on the
    /// bounded worker pool.
    fn scan_directory(&self, root: &Path, ignore: &IgnoreSet) {
        let mut batch: Vec<PathBuf> = Vec::with_capacity(self.batch_size);
        let summary = walker::walk_files(root, ignore, &mut |path| {
            batch.push(path);
            if batch.len() >= self.batch_size {
                self.process_batch(&batch);
                batch.clear();
            }
        });
        if !batch.is_empty() {
            self.process_batch(&batch);
        }
        if summary.errors > 0 {
            self.counters.add_errors(summary.errors as i64);
        }
    }

    fn process_batch(&self, batch: &[PathBuf]) {
        let paths: Vec<String> = batch
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        let existing = match self.db().fetch_records_by_paths(&paths) {
            Ok(records) => records,
            Err(err) => {
                error!("Failed to fetch existing records for batch: {}", err);
                HashMap::new()
            }
        };
        self.pool.install(|| {
            batch
                .par_iter()
                .for_each(|path| self.process_file(path, &existing));
        });
    }

    /// The per-file unit of work, shared by passes and live watch events:
    /// stat, confirm presence, skip when size+mtime are unchanged, otherwise
    /// fingerprint and upsert. Every failure is counted and skipped.
    fn process_file(&self, path: &Path, existing: &HashMap<String, FileRecord>) {
        let path_str = path.to_string_lossy().into_owned();

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Failed to stat {}: {}, skipping", path.display(), err);
                self.counters.add_error();
                return;
            }
        };

        // Confirming presence is all an unchanged file needs to survive the
        // cleanup phase.
        if let Err(err) = self.db().mark_file_seen(&path_str) {
            warn!("Failed to mark {} as seen: {}", path.display(), err);
        }

        if let Some(record) = existing.get(&path_str) {
            if record.file_size == metadata.len() as i64
                && record.modified_at == modified_at_nanos(&metadata)
            {
                self.counters.add_skipped();
                return;
            }
        }

        let fingerprint = match (self.fingerprint)(path) {
            Ok(fingerprint) => fingerprint,
            Err(err) => {
                warn!("Failed to fingerprint {}: {}, skipping", path.display(), err);
                self.counters.add_error();
                return;
            }
        };

        let record = FileRecord {
            fingerprint,
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path_str,
            file_size: metadata.len() as i64,
            modified_at: modified_at_nanos(&metadata),
            seen_flag: true,
        };
        match self.db().upsert_file(&record) {
            Ok(()) => self.counters.add_processed(),
            Err(err) => {
                error!("Failed to index {}: {}", path.display(), err);
                self.counters.add_error();
            }
        }
    }

    /// Index a single path in response to a live change event, using the
    /// same batch machinery as a pass. A directory (e.g. a tree moved into
    /// a monitored root) is walked in full.
    pub fn index_path(&self, path: &Path) {
        let patterns = match self.db().ignore_patterns() {
            Ok(patterns) => patterns,
            Err(err) => {
                error!("Failed to load ignore patterns: {}", err);
                return;
            }
        };
        let ignore = IgnoreSet::new(&patterns);
        if ignore.matches(path) {
            return;
        }
        if path.is_dir() {
            self.scan_directory(path, &ignore);
        } else {
            self.process_batch(&[path.to_path_buf()]);
        }
    }

    /// Drop the record whose path matches exactly, if any. Records under a
    /// removed directory are swept by the next pass.
    pub fn remove_path(&self, path: &Path) {
        let path_str = path.to_string_lossy();
        match self.db().delete_by_path(&path_str) {
            Ok(0) => {}
            Ok(_) => info!("Removed {} from index", path.display()),
            Err(err) => error!("Failed to remove {} from index: {}", path.display(), err),
        }
    }
}

pub(crate) fn modified_at_nanos(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_nanos() as i64)
        .unwrap_or(0)
}

enum Control {
    Scan,
    Stop,
}

/// Timer loop driving scheduled passes. Manual triggers coalesce through a
/// one-slot channel; a trigger arriving while one is already pending is
/// dropped, and the engine's own guard drops triggers that land mid-pass.
pub struct Scheduler {
    tx: SyncSender<Control>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(engine: Arc<ScanEngine>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::sync_channel(1);
        let handle = thread::spawn(move || {
            info!("Scheduler started, scanning every {:?}", interval);
            engine.perform_scan();
            loop {
                match rx.recv_timeout(interval) {
                    Ok(Control::Scan) | Err(RecvTimeoutError::Timeout) => {
                        engine.perform_scan();
                    }
                    Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("Scheduler stopped");
        });
        Self {
            tx,
            handle: Some(handle),
        }
    }

    pub fn trigger_manual_scan(&self) {
        match self.tx.try_send(Control::Scan) {
            Ok(()) => info!("Manual scan triggered"),
            Err(TrySendError::Full(_)) => info!("Scan already pending, ignoring manual trigger"),
            Err(TrySendError::Disconnected(_)) => warn!("Scheduler is not running"),
        }
    }

    /// Stop after any in-flight pass completes; there is no mid-pass
    /// cancellation.
    pub fn stop(mut self) {
        let _ = self.tx.send(Control::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
