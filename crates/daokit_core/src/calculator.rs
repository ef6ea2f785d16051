//! Number-file calculations expressed as line folds.
//!
//! Each operation is only an `(initial, step)` pair handed to
//! [`crate::line_fold::fold`]; acquisition, release and error reporting stay
//! in the template.

use crate::error::{DomainError, TemplateResult};
use crate::line_fold::{fold, LineSourceFactory};

/// Sums, multiplies or concatenates the lines of a source.
pub struct Calculator<F> {
    factory: F,
}

impl<F: LineSourceFactory> Calculator<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Adds every line parsed as `i64`. An empty source sums to `0`.
    ///
    /// # Errors
    /// - `DomainError::InvalidLine` for a non-integer line.
    /// - `DomainError::Overflow` when the sum leaves the `i64` range.
    pub fn calc_sum(&self, locator: &str) -> TemplateResult<i64> {
        fold(&self.factory, locator, 0i64, |line, total| {
            total
                .checked_add(parse_number(&line)?)
                .ok_or_else(DomainError::overflow)
        })
    }

    /// Multiplies every line parsed as `i64`. An empty source yields `1`.
    pub fn calc_multiply(&self, locator: &str) -> TemplateResult<i64> {
        fold(&self.factory, locator, 1i64, |line, product| {
            product
                .checked_mul(parse_number(&line)?)
                .ok_or_else(DomainError::overflow)
        })
    }

    /// Joins all lines without a separator.
    pub fn concatenate(&self, locator: &str) -> TemplateResult<String> {
        fold(&self.factory, locator, String::new(), |line, mut joined| {
            joined.push_str(&line);
            Ok(joined)
        })
    }
}

fn parse_number(line: &str) -> Result<i64, DomainError> {
    let trimmed = line.trim();
    trimmed
        .parse::<i64>()
        .map_err(|err| DomainError::invalid_line(format!("`{trimmed}` is not an integer: {err}")))
}
