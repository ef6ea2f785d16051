//! Scoped release of acquired handles.
//!
//! # Responsibility
//! - Define the close contract every Resource/SubResource/LineSource follows.
//! - Guarantee release on every exit path, unwinding included.
//!
//! # Invariants
//! - `Release::close` is idempotent: the second call is a no-op returning `Ok`.
//! - Release-phase errors are logged and discarded; they never replace the
//!   primary result of a template call.
//! - Guards declared later drop earlier, so nested handles release
//!   innermost-first.

use crate::error::InfraResult;
use log::{debug, warn};
use std::ops::{Deref, DerefMut};

/// Explicit, idempotent close for an acquired handle.
pub trait Release {
    /// Releases the underlying handle.
    ///
    /// Implementations must tolerate repeated calls; only the first one may
    /// have an observable effect.
    fn close(&mut self) -> InfraResult<()>;
}

impl<T: Release + ?Sized> Release for Box<T> {
    fn close(&mut self) -> InfraResult<()> {
        (**self).close()
    }
}

/// Closes `handle` and swallows the outcome after logging it.
pub fn release_quietly<T: Release + ?Sized>(label: &'static str, handle: &mut T) {
    match handle.close() {
        Ok(()) => debug!("event=release module=release status=ok resource={label}"),
        Err(err) => warn!(
            "event=release module=release status=error resource={label} error={err}"
        ),
    }
}

/// Owns a handle for one scope and releases it when the scope ends.
pub struct ReleaseGuard<T: Release> {
    label: &'static str,
    inner: T,
}

impl<T: Release> ReleaseGuard<T> {
    pub fn new(label: &'static str, inner: T) -> Self {
        Self { label, inner }
    }
}

impl<T: Release> Deref for ReleaseGuard<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: Release> DerefMut for ReleaseGuard<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T: Release> Drop for ReleaseGuard<T> {
    fn drop(&mut self) {
        release_quietly(self.label, &mut self.inner);
    }
}
