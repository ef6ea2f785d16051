//! Explicit object wiring.
//!
//! Builds DAOs and calculators from plain settings. Every collaborator is
//! handed its factory here instead of looking one up.

use crate::calculator::Calculator;
use crate::dao::UserDao;
use crate::file_source::FileLineSourceFactory;
use crate::sqlite::SqliteConnectionFactory;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Wiring root for one database file and one optional data directory.
#[derive(Debug, Clone)]
pub struct DaoFactory {
    db_path: PathBuf,
    busy_timeout: Option<Duration>,
    data_dir: Option<PathBuf>,
}

impl DaoFactory {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: None,
            data_dir: None,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = Some(busy_timeout);
        self
    }

    /// Base directory for relative calculator locators.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn connection_factory(&self) -> SqliteConnectionFactory {
        let factory = SqliteConnectionFactory::new(self.db_path.clone());
        match self.busy_timeout {
            Some(timeout) => factory.with_busy_timeout(timeout),
            None => factory,
        }
    }

    pub fn user_dao(&self) -> UserDao<SqliteConnectionFactory> {
        UserDao::new(self.connection_factory())
    }

    pub fn line_source_factory(&self) -> FileLineSourceFactory {
        match &self.data_dir {
            Some(dir) => FileLineSourceFactory::with_base_dir(dir.clone()),
            None => FileLineSourceFactory::new(),
        }
    }

    pub fn calculator(&self) -> Calculator<FileLineSourceFactory> {
        Calculator::new(self.line_source_factory())
    }
}
