//! Human-readable external ids such as `PAT00000042`.
//!
//! Each entity kind has a counter row in `id_sequences`; the counter is
//! bumped with `UPDATE .. RETURNING` on the same connection that inserts the
//! row, so two inserts can never draw the same value.

use sqlx::SqliteConnection;

const ID_DIGITS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Patient,
    Doctor,
    Appointment,
    Record,
}

impl IdKind {
    pub fn prefix(self) -> &'static str {
        match self {
            IdKind::Patient => "PAT",
            IdKind::Doctor => "DOC",
            IdKind::Appointment => "APT",
            IdKind::Record => "REC",
        }
    }
}

pub fn format_external_id(kind: IdKind, value: i64) -> String {
    format!("{}{:0width$}", kind.prefix(), value, width = ID_DIGITS)
}

/// Draws the next external id for `kind`. Call it inside the transaction that
/// inserts the row; as the first write it also takes SQLite's write lock.
pub async fn next_external_id(
    conn: &mut SqliteConnection,
    kind: IdKind,
) -> Result<String, sqlx::Error> {
    let value: i64 = sqlx::query_scalar(
        "UPDATE id_sequences SET next_value = next_value + 1 WHERE entity = ? RETURNING next_value",
    )
    .bind(kind.prefix())
    .fetch_one(&mut *conn)
    .await?;

    Ok(format_external_id(kind, value))
}
