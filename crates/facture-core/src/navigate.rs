//! Seams between the retry engine and its collaborators.
//!
//! The engine never sees retailer selectors or the browser driver directly:
//! it opens and closes sessions through [`SessionProvider`] and drives the
//! site through [`FormNavigator`]. Adding a retailer means adding one
//! navigator implementation; the retry/download machinery stays untouched.

use crate::{Profile, Result};
use async_trait::async_trait;

/// Owns the browser driver. Each `open` yields an independent session bound
/// to the configured download directory.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: Send + Sync;

    async fn open(&self) -> Result<Self::Session>;

    /// Tear the session down. Consumes the session, so a double close cannot
    /// be expressed. Callers treat the result as best-effort: a teardown
    /// failure is logged, never allowed to replace the attempt's outcome.
    async fn close(&self, session: Self::Session) -> Result<()>;
}

/// One retailer's scripted form interaction. Opaque to the engine: it either
/// returns with a download triggered, or fails with a navigation error.
#[async_trait]
pub trait FormNavigator<S>: Send + Sync {
    /// Profile fields this retailer's form cannot be submitted without.
    fn required_fields(&self) -> &'static [&'static str];

    async fn run(&self, session: &S, barcode: &str, profile: &Profile) -> Result<()>;
}
