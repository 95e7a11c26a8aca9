pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod ignore;
pub mod platform;
pub mod service;
pub mod status;
pub mod storage;
pub mod walker;
pub mod watcher;

pub use config::AppConfig;
pub use engine::{ScanEngine, Scheduler};
pub use error::Error;
pub use service::IndexService;
pub use status::ScanStatus;
