use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Seconds between scheduled reconciliation passes.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Number of candidate paths reconciled per store round-trip.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Concurrent per-file workers within a batch.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_db_path() -> String {
    "hashkeep.db".to_string()
}

fn default_scan_interval_secs() -> u64 {
    600
}

fn default_batch_size() -> usize {
    500
}

fn default_max_concurrency() -> usize {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scan_interval_secs: default_scan_interval_secs(),
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        let mut should_add = true;
        let result_clone = result.clone();

        for res_dir in &result_clone {
            let res_dir_path = Path::new(res_dir);

            if dir_path.starts_with(res_dir_path) {
                should_add = false;
                break;
            }

            if res_dir_path.starts_with(dir_path) {
                result.retain(|x| x != res_dir);
                break;
            }
        }

        if should_add {
            result.push(dir);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_overlapping_no_overlap() {
        let dirs = vec![
            "/home/user/photos".to_string(),
            "/home/user/docs".to_string(),
            "/var/data".to_string(),
        ];
        let result = non_overlapping_directories(dirs);
        assert_eq!(result.len(), 3);
        assert!(result.contains(&"/home/user/photos".to_string()));
        assert!(result.contains(&"/home/user/docs".to_string()));
        assert!(result.contains(&"/var/data".to_string()));
    }

    #[test]
    fn test_non_overlapping_with_subdirectory() {
        let dirs = vec![
            "/home/user".to_string(),
            "/home/user/docs".to_string(),
            "/var/data".to_string(),
        ];
        let result = non_overlapping_directories(dirs);
        assert_eq!(result.len(), 2);
        assert!(result.contains(&"/home/user".to_string()));
        assert!(result.contains(&"/var/data".to_string()));
        // /home/user/docs should be removed as it's under /home/user
        assert!(!result.contains(&"/home/user/docs".to_string()));
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, "hashkeep.db");
        assert_eq!(config.scan_interval_secs, 600);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.max_concurrency, 2);
    }
}
