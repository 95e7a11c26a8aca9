use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Snapshot of the in-progress (or most recent) reconciliation pass, as
/// served to the API/UI layer. Derived fields are computed at snapshot time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStatus {
    pub is_scanning: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub total_files: i64,
    pub processed_files: i64,
    pub skipped_files: i64,
    pub error_files: i64,
    pub deleted_files: i64,
    pub current_dir: String,
    /// `(processed + skipped) / total * 100`, when a total is known.
    pub progress: f64,
    /// Seconds since pass start, while a pass is in progress.
    pub elapsed_secs: f64,
}

#[derive(Debug, Default)]
struct ScanMeta {
    current_dir: String,
    started: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
}

/// Counters for one pass, owned by the engine. Workers bump the atomics
/// concurrently; everything is overwritten by `begin` at the next pass.
#[derive(Debug, Default)]
pub struct ScanCounters {
    scanning: AtomicBool,
    total: AtomicI64,
    processed: AtomicI64,
    skipped: AtomicI64,
    errors: AtomicI64,
    deleted: AtomicI64,
    meta: Mutex<ScanMeta>,
}

impl ScanCounters {
    pub fn begin(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.deleted.store(0, Ordering::Relaxed);
        {
            let mut meta = self.meta();
            meta.current_dir = "preparing".to_string();
            meta.started = Some(Instant::now());
            meta.started_at = Some(Utc::now());
        }
        self.scanning.store(true, Ordering::SeqCst);
    }

    pub fn finish(&self) {
        self.scanning.store(false, Ordering::SeqCst);
        self.meta().current_dir = "scan complete".to_string();
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub fn set_current_dir(&self, dir: &str) {
        self.meta().current_dir = dir.to_string();
    }

    pub fn set_total(&self, total: i64) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn add_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_errors(&self, count: i64) {
        self.errors.fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_deleted(&self, deleted: i64) {
        self.deleted.store(deleted, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScanStatus {
        let is_scanning = self.is_scanning();
        let total = self.total.load(Ordering::Relaxed);
        let processed = self.processed.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let meta = self.meta();

        let progress = if total > 0 {
            (processed + skipped) as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let elapsed_secs = match (is_scanning, meta.started) {
            (true, Some(started)) => started.elapsed().as_secs_f64(),
            _ => 0.0,
        };

        ScanStatus {
            is_scanning,
            start_time: meta.started_at,
            total_files: total,
            processed_files: processed,
            skipped_files: skipped,
            error_files: self.errors.load(Ordering::Relaxed),
            deleted_files: self.deleted.load(Ordering::Relaxed),
            current_dir: meta.current_dir.clone(),
            progress,
            elapsed_secs,
        }
    }

    fn meta(&self) -> std::sync::MutexGuard<'_, ScanMeta> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
