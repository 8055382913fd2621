pub mod db;
mod sqlite_impl;

/// The embedded schema migrations. Exposed so that binaries and test harnesses can run them
/// against freshly created databases.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./src/sqlite/migrations");

pub use sqlite_impl::SqliteDatabase;
