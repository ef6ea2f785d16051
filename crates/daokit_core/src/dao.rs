//! User data access built on the statement template.
//!
//! # Responsibility
//! - Express user persistence as statement strategies and read-side work.
//! - Leave connection lifecycle and error translation to `SqlContext`.
//!
//! # Invariants
//! - `users.id` is unique; a second `add` with the same id yields
//!   `DomainError::DuplicateKey`.

use crate::error::{InfraError, InfraResult, TemplateResult};
use crate::executor::{ResourceFactory, SqlContext};
use crate::sqlite::{SqlStatement, SqliteConnection};
use serde::{Deserialize, Serialize};

const INSERT_USER_SQL: &str = "INSERT INTO users (id, name, password) VALUES (?1, ?2, ?3);";

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub password: String,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            password: password.into(),
        }
    }
}

/// User DAO over an injected SQLite connection factory.
pub struct UserDao<F> {
    context: SqlContext<F>,
}

impl<F> UserDao<F>
where
    F: ResourceFactory<Resource = SqliteConnection>,
{
    pub fn new(factory: F) -> Self {
        Self::with_context(SqlContext::new(factory))
    }

    pub fn with_context(context: SqlContext<F>) -> Self {
        Self { context }
    }

    /// Inserts `user`.
    ///
    /// # Errors
    /// - `DomainError::DuplicateKey` when the id already exists.
    pub fn add(&self, user: &User) -> TemplateResult<()> {
        let insert = SqlStatement::new(INSERT_USER_SQL)
            .bind(user.id.clone())
            .bind(user.name.clone())
            .bind(user.password.clone());
        self.context.work_with_statement_strategy(&insert)?;
        Ok(())
    }

    /// Loads one user by id.
    pub fn get(&self, id: &str) -> TemplateResult<Option<User>> {
        self.context.with_connection(|resource| {
            let mut stmt = resource
                .connection()?
                .prepare("SELECT id, name, password FROM users WHERE id = ?1;")?;
            let mut rows = stmt.query([id])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(User {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    password: row.get("password")?,
                }));
            }
            Ok(None)
        })
    }

    pub fn get_count(&self) -> TemplateResult<u64> {
        self.context.with_connection(|resource| {
            let count: i64 = resource
                .connection()?
                .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
            Ok(row_count(count)?)
        })
    }

    /// Removes every user and returns how many rows were deleted.
    pub fn delete_all(&self) -> TemplateResult<usize> {
        self.context.execute_sql("DELETE FROM users;")
    }
}

fn row_count(count: i64) -> InfraResult<u64> {
    u64::try_from(count).map_err(|_| {
        InfraError::Unavailable(format!("sqlite reported a negative row count {count}"))
    })
}
