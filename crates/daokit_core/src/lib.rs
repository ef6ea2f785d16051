//! Execute-around templates for resource-scoped data access.
//! Callers supply policy (statements, fold steps); this crate owns
//! acquisition, release and error translation.

pub mod calculator;
pub mod dao;
pub mod db;
pub mod error;
pub mod executor;
pub mod factory;
pub mod file_source;
pub mod line_fold;
pub mod logging;
pub mod release;
pub mod sqlite;

pub use calculator::Calculator;
pub use dao::{User, UserDao};
pub use error::{
    translate, DomainError, InfraError, InfraResult, TemplateError, TemplateResult,
};
pub use executor::{
    execute, with_resource, PreparedWork, ResourceFactory, SqlContext, StatementStrategy,
};
pub use factory::DaoFactory;
pub use file_source::{
    FileLineSource, FileLineSourceFactory, MemoryLineSource, MemoryLineSourceFactory,
    ReaderLineSource,
};
pub use line_fold::{fold, lines, with_line_source, LineSource, LineSourceFactory, Lines};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use release::{release_quietly, Release, ReleaseGuard};
pub use sqlite::{SqlStatement, SqliteConnection, SqliteConnectionFactory, SqliteStatement};

/// Minimal health-check API for smoke checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
