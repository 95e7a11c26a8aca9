use crate::ignore::IgnoreSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Default, Clone, Copy)]
pub struct WalkSummary {
    /// Entries that could not be read (permission denied, vanished mid-walk,
    /// unreadable metadata). Skipped, never fatal.
    pub errors: u64,
}

/// Depth-first walk of `root`, invoking `on_file` for every regular file
/// that survives the ignore set. Directories matching the ignore set are
/// pruned without descent; symlinks are skipped; directories themselves are
/// never yielded. A fresh walk happens on every call.
pub fn walk_files<F: FnMut(PathBuf)>(root: &Path, ignore: &IgnoreSet, on_file: &mut F) -> WalkSummary {
    let mut summary = WalkSummary::default();
    visit_dir(root, ignore, on_file, &mut summary);
    summary
}

/// Disposable counting walk used for progress totals. The result is
/// advisory only; the reconcile walk re-enumerates from scratch.
pub fn count_files(root: &Path, ignore: &IgnoreSet) -> u64 {
    let mut count = 0u64;
    walk_files(root, ignore, &mut |_| count += 1);
    count
}

fn visit_dir<F: FnMut(PathBuf)>(
    dir: &Path,
    ignore: &IgnoreSet,
    on_file: &mut F,
    summary: &mut WalkSummary,
) {
    if ignore.matches(dir) {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Error reading directory {}: {}, skipping", dir.display(), err);
            summary.errors += 1;
            return;
        }
    };

    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error reading entry in {}: {}, skipping", dir.display(), err);
                summary.errors += 1;
                continue;
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!("Error reading type of {}: {}, skipping", path.display(), err);
                summary.errors += 1;
                continue;
            }
        };

        if ignore.matches(&path) {
            continue;
        }

        if file_type.is_dir() {
            visit_dir(&path, ignore, on_file, summary);
        } else if !file_type.is_symlink() {
            on_file(path);
        }
    }
}
