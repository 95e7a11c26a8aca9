use serde::Serialize;

/// One indexed file, keyed by content fingerprint. The same content at a new
/// path updates `path` on the existing row rather than creating a duplicate.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub fingerprint: String,
    pub path: String,
    pub file_name: String,
    pub file_size: i64,
    /// Nanoseconds since the unix epoch. Together with `file_size` this is
    /// the cheap change proxy that decides whether a file is re-hashed.
    pub modified_at: i64,
    /// Liveness flag, meaningful only during a reconciliation pass: cleared
    /// at pass start, re-set as the pass confirms each path, and any row
    /// still clear at pass end is deleted.
    pub seen_flag: bool,
}
