//! SQLite-backed resource factory, resource, statement and strategy.
//!
//! # Responsibility
//! - Hand out one freshly opened, schema-checked connection per template call.
//! - Adapt `rusqlite` statements to the `PreparedWork` contract.
//!
//! # Invariants
//! - Every `SqliteConnection` owns a distinct underlying connection and id.
//! - `close` is idempotent on connections and statements.
//! - A closed handle reports `InfraError::Released` instead of being reused.

use crate::db::{open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT};
use crate::error::{InfraError, InfraResult};
use crate::executor::{PreparedWork, ResourceFactory, StatementStrategy};
use crate::release::Release;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Statement};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum DbTarget {
    File(PathBuf),
    /// Each connection gets its own private database.
    Memory,
}

/// Opens a new SQLite connection for every `new_resource` call.
///
/// Holds only configuration, so one factory can be shared across threads.
#[derive(Debug, Clone)]
pub struct SqliteConnectionFactory {
    target: DbTarget,
    busy_timeout: Duration,
}

impl SqliteConnectionFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            target: DbTarget::File(path.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            target: DbTarget::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Returns the database file path, or `None` for in-memory factories.
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            DbTarget::File(path) => Some(path.as_path()),
            DbTarget::Memory => None,
        }
    }
}

impl ResourceFactory for SqliteConnectionFactory {
    type Resource = SqliteConnection;

    fn new_resource(&self) -> InfraResult<SqliteConnection> {
        let conn = match &self.target {
            DbTarget::File(path) => open_db(path, self.busy_timeout)?,
            DbTarget::Memory => open_db_in_memory()?,
        };
        let resource = SqliteConnection::new(conn);
        debug!(
            "event=resource_acquire module=sqlite status=ok conn_id={}",
            resource.id()
        );
        Ok(resource)
    }
}

/// One acquired SQLite connection.
pub struct SqliteConnection {
    id: Uuid,
    conn: Option<Connection>,
}

impl SqliteConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            id: Uuid::new_v4(),
            conn: Some(conn),
        }
    }

    /// Per-acquisition id used for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Borrows the live connection.
    ///
    /// # Errors
    /// - `InfraError::Released` after `close`.
    pub fn connection(&self) -> InfraResult<&Connection> {
        self.conn.as_ref().ok_or(InfraError::Released {
            resource: "connection",
        })
    }
}

impl Release for SqliteConnection {
    fn close(&mut self) -> InfraResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        debug!(
            "event=resource_release module=sqlite status=start conn_id={}",
            self.id
        );
        // On failure rusqlite hands the connection back; dropping it closes
        // the handle on a best-effort basis.
        conn.close().map_err(|(_conn, err)| InfraError::Sqlite(err))
    }
}

/// Prepared statement plus its bound parameters.
pub struct SqliteStatement<'conn> {
    statement: Option<Statement<'conn>>,
    params: Vec<Value>,
}

impl<'conn> SqliteStatement<'conn> {
    pub fn new(statement: Statement<'conn>, params: Vec<Value>) -> Self {
        Self {
            statement: Some(statement),
            params,
        }
    }
}

impl PreparedWork for SqliteStatement<'_> {
    fn run_update(&mut self) -> InfraResult<usize> {
        let statement = self.statement.as_mut().ok_or(InfraError::Released {
            resource: "statement",
        })?;
        let affected = statement.execute(params_from_iter(self.params.iter()))?;
        Ok(affected)
    }
}

impl Release for SqliteStatement<'_> {
    fn close(&mut self) -> InfraResult<()> {
        match self.statement.take() {
            Some(statement) => Ok(statement.finalize()?),
            None => Ok(()),
        }
    }
}

/// Statement strategy built from SQL text and positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    sql: String,
    params: Vec<Value>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends the next positional parameter (`?1`, `?2`, ...).
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl StatementStrategy<SqliteConnection> for SqlStatement {
    fn make_statement<'r>(
        &self,
        resource: &'r SqliteConnection,
    ) -> InfraResult<Box<dyn PreparedWork + 'r>> {
        let statement = resource.connection()?.prepare(&self.sql)?;
        Ok(Box::new(SqliteStatement::new(statement, self.params.clone())))
    }
}
