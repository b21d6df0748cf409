//! Database migration runner.
//!
//! Migrations are executed in order on every [`Database`](crate::Database)
//! open. Each one is guarded by the `user_version` pragma so it runs exactly
//! once.

pub mod v001_initial;
pub mod v002_stamps;
pub mod v003_user_series;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

type Migration = fn(&Connection) -> std::result::Result<(), rusqlite::Error>;

const MIGRATIONS: &[(&str, Migration)] = &[
    ("v001_initial", v001_initial::up),
    ("v002_stamps", v002_stamps::up),
    ("v003_user_series", v003_user_series::up),
];

/// Current schema version. Add a module and a `MIGRATIONS` entry whenever
/// the schema changes.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Run all pending migrations against the open connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::info!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking database migrations"
    );

    for (index, (name, up)) in MIGRATIONS.iter().enumerate() {
        let version = index as u32 + 1;
        if current >= version {
            continue;
        }
        tracing::info!(migration = name, "applying migration");
        up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}
