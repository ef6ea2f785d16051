//! Connection opening and schema bootstrap for SQLite.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and the configured busy timeout.
//! - Returned connections carry the `users` schema stamped at `SCHEMA_VERSION`.
//! - A database stamped by a newer build is rejected untouched.

use crate::error::{InfraError, InfraResult};
use log::{debug, error};
use rusqlite::Connection;
use std::cmp::Ordering;
use std::path::Path;
use std::time::{Duration, Instant};

/// Busy timeout applied when the caller does not choose one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Schema revision written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

const USERS_SCHEMA: &str = include_str!("users.sql");

/// Opens a SQLite database file and brings its schema up to `SCHEMA_VERSION`.
pub fn open_db(path: impl AsRef<Path>, busy_timeout: Duration) -> InfraResult<Connection> {
    let started_at = Instant::now();
    let opened = Connection::open(path);
    finish_open(opened, "file", busy_timeout, started_at)
}

/// Opens a private in-memory database with the schema installed.
pub fn open_db_in_memory() -> InfraResult<Connection> {
    let started_at = Instant::now();
    let opened = Connection::open_in_memory();
    finish_open(opened, "memory", DEFAULT_BUSY_TIMEOUT, started_at)
}

fn finish_open(
    opened: rusqlite::Result<Connection>,
    mode: &str,
    busy_timeout: Duration,
    started_at: Instant,
) -> InfraResult<Connection> {
    let outcome = opened
        .map_err(InfraError::from)
        .and_then(|conn| configure(&conn, busy_timeout).map(|()| conn));

    match &outcome {
        Ok(_) => debug!(
            "event=db_open module=db status=ok mode={} busy_timeout_ms={} duration_ms={}",
            mode,
            busy_timeout.as_millis(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    outcome
}

fn configure(conn: &Connection, busy_timeout: Duration) -> InfraResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(busy_timeout)?;
    ensure_schema(conn)
}

fn ensure_schema(conn: &Connection) -> InfraResult<()> {
    let found: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    match found.cmp(&SCHEMA_VERSION) {
        Ordering::Equal => Ok(()),
        Ordering::Greater => Err(InfraError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: SCHEMA_VERSION,
        }),
        Ordering::Less => {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(USERS_SCHEMA)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tx.commit()?;
            debug!(
                "event=schema_install module=db status=ok from_version={} to_version={}",
                found, SCHEMA_VERSION
            );
            Ok(())
        }
    }
}
