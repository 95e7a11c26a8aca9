pub mod models;
mod queries;
mod sqlite;

pub use models::FileRecord;
pub use sqlite::Database;
