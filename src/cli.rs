use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "hashkeep")]
#[command(about = "A content-addressed file index", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the daemon: scheduled passes plus live file watching
    Run,
    /// Run a single reconciliation pass in the foreground
    Scan,
    /// Add a directory to the monitored set and index it
    Add {
        path: String,
    },
    /// Stop monitoring a directory and drop its records
    Remove {
        path: String,
    },
    /// Print the monitored directories
    Dirs,
    /// Print the configured ignore patterns
    Patterns,
    /// Replace the ignore patterns (glob syntax)
    SetPatterns {
        patterns: Vec<String>,
    },
    /// Look up an indexed file by content fingerprint
    Lookup {
        fingerprint: String,
        /// Also reveal the file in the platform file browser
        #[arg(long)]
        reveal: bool,
    },
    /// List indexed files, newest first
    List {
        /// Substring filter over filename and path
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 20)]
        page_size: i64,
    },
    /// Print configuration values
    PrintConfig,
}
