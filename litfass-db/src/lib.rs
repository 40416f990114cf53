pub mod client;
pub mod record;

/// Embedded migrations, run once at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
