use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Error, SqlitePool};
use thiserror::Error;

pub mod appointments;
pub mod doctors;
pub mod models;
pub mod patients;
pub mod records;
pub mod sessions;
pub mod users;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to parse database URL: {0}")]
    UrlParse(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] Error),
    #[error("Failed to apply schema: {0}")]
    Schema(String),
}

/// Opens (creating if missing) the SQLite database behind `database_url` and
/// applies the schema. The returned pool lives for the whole process.
pub async fn init_db(database_url: &str, max_connections: u32) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DatabaseError::UrlParse(e.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Sqlx)?;

    apply_schema(&pool).await?;

    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::Schema(e.to_string()))?;

    Ok(())
}

/// Returns the constraint message when `err` is a UNIQUE violation.
pub fn unique_violation(err: &Error) -> Option<String> {
    match err {
        Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.message().to_string())
        }
        _ => None,
    }
}

/// Returns true when `err` is a foreign key violation.
pub fn foreign_key_violation(err: &Error) -> bool {
    matches!(err, Error::Database(db_err) if db_err.is_foreign_key_violation())
}
