//! Error taxonomy and failure translation shared by all templates.
//!
//! # Responsibility
//! - Separate infrastructure faults from recognized business-rule violations.
//! - Classify one caught low-level failure exactly once, without retries.
//! - Decide how a failure is logged before it is handed back to the caller.
//!
//! # Invariants
//! - `translate` is pure: same input kind, same output kind.
//! - A `DomainError` replaces the `InfraError` it was derived from; callers
//!   never receive both.
//! - Release-phase errors never reach this module's public result types;
//!   see `crate::release`.

use log::{error, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Captures `table.column[, table.column...]` from SQLite constraint messages,
/// e.g. `UNIQUE constraint failed: users.id`.
static CONSTRAINT_TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"constraint failed: ([\w.]+(?:, [\w.]+)*)").expect("valid constraint regex")
});

pub type InfraResult<T> = Result<T, InfraError>;
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Low-level failure raised by a resource, a factory or a strategy.
#[derive(Debug)]
pub enum InfraError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    /// A handle was used after its release.
    Released { resource: &'static str },
    /// A factory could not hand out a resource for a non-driver reason.
    Unavailable(String),
    /// The database was written by a newer schema than this build knows.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for InfraError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Released { resource } => write!(f, "{resource} was already released"),
            Self::Unavailable(message) => write!(f, "resource unavailable: {message}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for InfraError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Released { .. } => None,
            Self::Unavailable(_) => None,
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for InfraError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Recognized business-rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A uniqueness constraint rejected the write.
    ///
    /// `key` is the constrained `table.column` list when the driver reports it.
    DuplicateKey { key: Option<String> },
    /// A line could not be interpreted by a fold step.
    ///
    /// `line_number` is 1-based and `None` until the fold template positions it.
    InvalidLine {
        line_number: Option<usize>,
        message: String,
    },
    /// An accumulated numeric value left the representable range.
    Overflow { line_number: Option<usize> },
}

impl DomainError {
    /// Creates an unpositioned `InvalidLine` error; `fold` adds the position.
    pub fn invalid_line(message: impl Into<String>) -> Self {
        Self::InvalidLine {
            line_number: None,
            message: message.into(),
        }
    }

    pub fn overflow() -> Self {
        Self::Overflow { line_number: None }
    }

    /// Returns the same error positioned at `line_number` (1-based).
    pub fn with_line_number(self, line_number: usize) -> Self {
        match self {
            Self::InvalidLine { message, .. } => Self::InvalidLine {
                line_number: Some(line_number),
                message,
            },
            Self::Overflow { .. } => Self::Overflow {
                line_number: Some(line_number),
            },
            other => other,
        }
    }
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKey { key: Some(key) } => write!(f, "duplicated key: {key}"),
            Self::DuplicateKey { key: None } => write!(f, "duplicated key"),
            Self::InvalidLine {
                line_number: Some(line_number),
                message,
            } => write!(f, "invalid line {line_number}: {message}"),
            Self::InvalidLine {
                line_number: None,
                message,
            } => write!(f, "invalid line: {message}"),
            Self::Overflow {
                line_number: Some(line_number),
            } => write!(f, "numeric overflow while folding line {line_number}"),
            Self::Overflow { line_number: None } => write!(f, "numeric overflow"),
        }
    }
}

impl Error for DomainError {}

/// The single error type returned by template calls.
#[derive(Debug)]
pub enum TemplateError {
    Domain(DomainError),
    Infra(InfraError),
}

impl TemplateError {
    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// Returns the domain error, if this failure is a business-rule violation.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(err) => Some(err),
            Self::Infra(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Infra(_) => "infra",
        }
    }
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain(err) => write!(f, "{err}"),
            Self::Infra(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TemplateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Domain(err) => Some(err),
            Self::Infra(err) => Some(err),
        }
    }
}

impl From<DomainError> for TemplateError {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}

impl From<InfraError> for TemplateError {
    fn from(value: InfraError) -> Self {
        Self::Infra(value)
    }
}

impl From<rusqlite::Error> for TemplateError {
    fn from(value: rusqlite::Error) -> Self {
        translate(InfraError::Sqlite(value))
    }
}

/// Classifies one low-level failure.
///
/// Uniqueness and primary-key violations become `DomainError::DuplicateKey`;
/// every other failure is returned as an opaque infrastructure error.
pub fn translate(err: InfraError) -> TemplateError {
    match unique_violation_key(&err) {
        Some(key) => TemplateError::Domain(DomainError::DuplicateKey { key }),
        None => TemplateError::Infra(err),
    }
}

/// Returns `Some(key)` when `err` is a uniqueness violation.
///
/// The inner option carries the constrained columns when the driver message
/// names them.
fn unique_violation_key(err: &InfraError) -> Option<Option<String>> {
    let InfraError::Sqlite(rusqlite::Error::SqliteFailure(failure, message)) = err else {
        return None;
    };
    if failure.extended_code != ffi::SQLITE_CONSTRAINT_UNIQUE
        && failure.extended_code != ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    {
        return None;
    }

    Some(message.as_deref().and_then(|text| {
        CONSTRAINT_TARGET_RE
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|target| target.as_str().to_string())
    }))
}

/// Logs a failure that is about to be returned to the caller.
///
/// Domain errors are expected outcomes of business rules and log at `warn`;
/// infrastructure errors log at `error`.
pub(crate) fn report_failure(event: &str, err: &TemplateError) {
    match err {
        TemplateError::Domain(_) => warn!(
            "event={event} module=template status=error kind={} error={err}",
            err.kind()
        ),
        TemplateError::Infra(_) => error!(
            "event={event} module=template status=error kind={} error={err}",
            err.kind()
        ),
    }
}
