use glob::Pattern;
use std::path::Path;
use tracing::error;

/// A set of glob exclusion patterns, compiled once at the start of a pass
/// and held for its duration. Matching is against the entry's base name, for
/// files and directories alike; the walker prunes the whole subtree when a
/// directory matches.
#[derive(Debug, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new(globs: &[String]) -> Self {
        let patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    error!("Invalid glob pattern '{}': {}", glob, err);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.iter().any(|pattern| pattern.matches(name))
    }
}
