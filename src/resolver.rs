//! Ordered fallback resolution across alternative data sources.
//!
//! Each artifact that can be sourced more than one way models its sourcing as
//! an ordered list of [`SourceProvider`]s sharing one capability contract.
//! Resolution walks the list until a source yields usable data; source
//! failures move the chain along, they never escape.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// A single alternative source for an artifact's data.
///
/// `Err` means the source failed (unreachable, timed out, malformed payload).
/// `Ok(None)` means the source answered but had nothing usable, e.g. zero
/// rows. Both move resolution to the next source.
#[async_trait]
pub trait SourceProvider<T>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self) -> Result<Option<T>>;
}

/// Try each provider in priority order and return the first usable result.
///
/// Never errors: a source failure is logged and the chain falls through. An
/// exhausted chain returns `None`; the caller decides whether an empty output
/// is itself an error.
pub async fn resolve<T: Send>(providers: &[Box<dyn SourceProvider<T>>]) -> Option<T> {
    for provider in providers {
        match provider.attempt().await {
            Ok(Some(result)) => {
                debug!("[RESOLVE] {} yielded usable data", provider.name());
                return Some(result);
            }
            Ok(None) => {
                debug!("[RESOLVE] {} empty, trying next source", provider.name());
            }
            Err(e) => {
                warn!("[RESOLVE] {} unavailable, trying next source: {:#}", provider.name(), e);
            }
        }
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================
