//! Resource-scoped execution template.
//!
//! # Responsibility
//! - Acquire exactly one resource per call from an injected factory.
//! - Turn it into one unit of work through a caller-supplied strategy.
//! - Release the unit of work, then the resource, on every exit path.
//!
//! # Invariants
//! - Acquisition failures are returned as `TemplateError::Infra`, untranslated.
//! - Strategy and execution failures pass through `error::translate` once.
//! - A `PreparedWork` borrows its resource, so it cannot outlive it and is
//!   always released first.
//! - Nothing acquired here escapes the call.

use crate::error::{report_failure, translate, InfraResult, TemplateError, TemplateResult};
use crate::release::{Release, ReleaseGuard};
use crate::sqlite::{SqlStatement, SqliteConnection};
use log::debug;
use std::time::Instant;

/// Hands out fresh resources.
///
/// Shared factories must tolerate concurrent `new_resource` calls; the
/// template never synchronizes access to them.
pub trait ResourceFactory {
    type Resource: Release;

    fn new_resource(&self) -> InfraResult<Self::Resource>;
}

impl<F: ResourceFactory + ?Sized> ResourceFactory for &F {
    type Resource = F::Resource;

    fn new_resource(&self) -> InfraResult<Self::Resource> {
        (**self).new_resource()
    }
}

/// A prepared unit of work derived from a resource (a statement, usually).
pub trait PreparedWork: Release {
    /// Runs the primary action and returns the number of affected rows.
    fn run_update(&mut self) -> InfraResult<usize>;
}

/// Caller-supplied policy producing the unit of work for one call.
pub trait StatementStrategy<R> {
    fn make_statement<'r>(&self, resource: &'r R) -> InfraResult<Box<dyn PreparedWork + 'r>>;
}

/// Runs `work` against one freshly acquired resource and releases it.
///
/// This is the resource-scoped half of [`execute`]; read paths use it
/// directly when they need more than an update.
pub fn with_resource<F, T, W>(factory: &F, work: W) -> TemplateResult<T>
where
    F: ResourceFactory + ?Sized,
    W: FnOnce(&F::Resource) -> TemplateResult<T>,
{
    let resource = match factory.new_resource() {
        Ok(resource) => resource,
        Err(err) => {
            let err = TemplateError::Infra(err);
            report_failure("resource_acquire", &err);
            return Err(err);
        }
    };
    let resource = ReleaseGuard::new("resource", resource);

    let outcome = work(&*resource);
    if let Err(err) = &outcome {
        report_failure("resource_work", err);
    }
    outcome
}

/// Executes one strategy-produced statement against one fresh resource.
///
/// Returns the affected row count. Uniqueness violations come back as
/// `DomainError::DuplicateKey`; other failures as `TemplateError::Infra`.
pub fn execute<F, S>(factory: &F, strategy: &S) -> TemplateResult<usize>
where
    F: ResourceFactory + ?Sized,
    S: StatementStrategy<F::Resource> + ?Sized,
{
    let started_at = Instant::now();
    let outcome = with_resource(factory, |resource| {
        let statement = strategy.make_statement(resource).map_err(translate)?;
        let mut statement = ReleaseGuard::new("statement", statement);
        statement.run_update().map_err(translate)
    });

    if let Ok(affected) = &outcome {
        debug!(
            "event=execute module=executor status=ok affected={} duration_ms={}",
            affected,
            started_at.elapsed().as_millis()
        );
    }
    outcome
}

/// Execution context bound to one injected resource factory.
///
/// The context never constructs its factory; callers wire it in.
pub struct SqlContext<F> {
    factory: F,
}

impl<F: ResourceFactory> SqlContext<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Runs `strategy` with guaranteed statement and resource release.
    pub fn work_with_statement_strategy<S>(&self, strategy: &S) -> TemplateResult<usize>
    where
        S: StatementStrategy<F::Resource> + ?Sized,
    {
        execute(&self.factory, strategy)
    }

    /// Runs arbitrary read-side work against one fresh resource.
    pub fn with_connection<T>(
        &self,
        work: impl FnOnce(&F::Resource) -> TemplateResult<T>,
    ) -> TemplateResult<T> {
        with_resource(&self.factory, work)
    }
}

impl<F: ResourceFactory<Resource = SqliteConnection>> SqlContext<F> {
    /// Executes parameterless SQL text as a single update.
    pub fn execute_sql(&self, sql: &str) -> TemplateResult<usize> {
        self.work_with_statement_strategy(&SqlStatement::new(sql))
    }
}
