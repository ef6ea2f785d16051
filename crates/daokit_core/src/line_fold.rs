//! Line-scoped reading and folding templates.
//!
//! # Responsibility
//! - Acquire one line source per call from an injected factory.
//! - Fold a caller-supplied step over every line, strictly in source order.
//! - Release the source exactly once, after the loop, on every exit path.
//!
//! # Invariants
//! - Lines are read lazily and at most once; nothing past a failing line is read.
//! - Failures are logged, then returned; release-phase errors are only logged.
//! - The fold is sequential; the accumulator never crosses threads.

use crate::error::{
    report_failure, translate, DomainError, InfraResult, TemplateError, TemplateResult,
};
use crate::release::{Release, ReleaseGuard};
use log::debug;
use std::iter::FusedIterator;

/// Sequential line reader terminating at end-of-stream.
pub trait LineSource: Release {
    /// Returns the next line without its terminator, or `None` at end-of-stream.
    fn next_line(&mut self) -> InfraResult<Option<String>>;
}

/// Opens line sources by locator (a path, a key, ...).
pub trait LineSourceFactory {
    type Source: LineSource;

    fn new_line_source(&self, locator: &str) -> InfraResult<Self::Source>;
}

impl<F: LineSourceFactory + ?Sized> LineSourceFactory for &F {
    type Source = F::Source;

    fn new_line_source(&self, locator: &str) -> InfraResult<Self::Source> {
        (**self).new_line_source(locator)
    }
}

/// Lazy, non-restartable line sequence over a borrowed source.
///
/// Yields `Err` at most once and then stops.
pub struct Lines<'a, S: ?Sized> {
    source: &'a mut S,
    finished: bool,
}

/// Borrows `source` as a lazy line sequence.
pub fn lines<S: LineSource + ?Sized>(source: &mut S) -> Lines<'_, S> {
    Lines {
        source,
        finished: false,
    }
}

impl<S: LineSource + ?Sized> Iterator for Lines<'_, S> {
    type Item = InfraResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.source.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl<S: LineSource + ?Sized> FusedIterator for Lines<'_, S> {}

/// Hands one freshly opened line source to `callback` and releases it afterwards.
pub fn with_line_source<F, T, C>(factory: &F, locator: &str, callback: C) -> TemplateResult<T>
where
    F: LineSourceFactory + ?Sized,
    C: FnOnce(&mut F::Source) -> TemplateResult<T>,
{
    let source = match factory.new_line_source(locator) {
        Ok(source) => source,
        Err(err) => {
            let err = TemplateError::Infra(err);
            report_failure("line_source_open", &err);
            return Err(err);
        }
    };
    let mut source = ReleaseGuard::new("line_source", source);

    let outcome = callback(&mut *source);
    if let Err(err) = &outcome {
        report_failure("line_source_work", err);
    }
    outcome
}

/// Folds `step` over every line of the source at `locator`, starting at `initial`.
///
/// A failing `step` or read aborts the fold; `DomainError`s returned by `step`
/// are positioned at the 1-based number of the offending line.
pub fn fold<F, T, S>(factory: &F, locator: &str, initial: T, mut step: S) -> TemplateResult<T>
where
    F: LineSourceFactory + ?Sized,
    S: FnMut(String, T) -> Result<T, DomainError>,
{
    with_line_source(factory, locator, |source| {
        let mut accumulator = initial;
        let mut consumed = 0usize;
        for line in lines(source) {
            let line = line.map_err(translate)?;
            consumed += 1;
            accumulator =
                step(line, accumulator).map_err(|err| err.with_line_number(consumed))?;
        }
        debug!("event=fold module=line_fold status=ok lines={consumed}");
        Ok(accumulator)
    })
}
