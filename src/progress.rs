use hashkeep::ScanEngine;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Renders a foreground pass by polling the engine's status snapshots:
/// a spinner while the total is unknown, then a bar once the count phase
/// has produced one.
pub struct ScanProgress {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ScanProgress {
    pub fn start(engine: Arc<ScanEngine>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}")
                    .unwrap()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            pb.enable_steady_tick(Duration::from_millis(80));

            let mut bar_mode = false;
            while !stop_flag.load(Ordering::Relaxed) {
                let status = engine.status();
                if status.total_files > 0 && !bar_mode {
                    pb.set_style(
                        ProgressStyle::with_template(
                            "{prefix:.bold}▕{bar:.blue}▏{pos}/{len} {msg}",
                        )
                        .unwrap()
                        .progress_chars("█▓▒░  "),
                    );
                    pb.set_prefix("Reconciling:");
                    pb.set_length(status.total_files as u64);
                    bar_mode = true;
                }
                if bar_mode {
                    pb.set_position((status.processed_files + status.skipped_files) as u64);
                    pb.set_message(status.current_dir);
                } else {
                    pb.set_message(format!("{}...", status.current_dir));
                }
                thread::sleep(Duration::from_millis(100));
            }
            pb.finish_and_clear();
        });

        Self { stop, handle }
    }

    pub fn finish(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}
