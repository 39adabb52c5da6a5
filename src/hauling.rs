//! Warm-set population for hauling pair snapshots.
//!
//! The configured hot pairs are fetched from the live hauling API and
//! published one blob per pair. A bad upstream answer for one pair never
//! aborts the batch; a failed publish does, since that means the blob store
//! itself is down.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde_json::Value;
use tracing::{info, warn};

use crate::blob::BlobStore;
use crate::config::{CACHE_CONTROL_HAULING, HTTP_TIMEOUT_SECS, WARM_FETCH_CONCURRENCY};
use crate::types::HotPair;

/// Upstream yielding the route document for one pair.
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Fetch the route document for `pair`. Must fail on non-success status
    /// and on payloads missing the `routes` array; the populate loop treats
    /// both the same as a transport failure.
    async fn fetch_routes(&self, pair: &HotPair) -> Result<Value>;
}

/// Client for the live region-hauling query API.
pub struct HaulingApiClient {
    http: reqwest::Client,
    base_url: String,
    route_limit: u32,
}

impl HaulingApiClient {
    pub fn new(base_url: &str, route_limit: u32) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            route_limit,
        }
    }
}

#[async_trait]
impl RouteSource for HaulingApiClient {
    async fn fetch_routes(&self, pair: &HotPair) -> Result<Value> {
        let url = format!(
            "{}/hauling?from_region={}&to_region={}&limit={}",
            self.base_url, pair.from, pair.to, self.route_limit
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetching routes for {pair}"))?;
        if !resp.status().is_success() {
            bail!("hauling API returned {} for {}", resp.status(), pair);
        }

        let doc: Value = resp
            .json()
            .await
            .with_context(|| format!("decoding route payload for {pair}"))?;
        if !doc.get("routes").map_or(false, Value::is_array) {
            bail!("route payload for {} has no routes array", pair);
        }
        Ok(doc)
    }
}

/// Outcome counters for one populate run. The logs are the audit trail; the
/// counters only feed the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PopulateStats {
    pub attempted: usize,
    pub published: usize,
    pub skipped: usize,
}

/// Attempt every hot pair exactly once, publishing each successful fetch.
///
/// Fetches run through a stream bounded by [`WARM_FETCH_CONCURRENCY`] so the
/// sequential-load policy holds even if the cap is ever raised. Fetch
/// failures are logged per pair and skipped; publish failures propagate and
/// abort the run.
pub async fn populate(
    pairs: &[HotPair],
    source: &dyn RouteSource,
    store: &dyn BlobStore,
) -> Result<PopulateStats> {
    let mut stats = PopulateStats::default();

    let mut fetches = stream::iter(pairs.iter().copied())
        .map(|pair| async move { (pair, source.fetch_routes(&pair).await) })
        .buffered(WARM_FETCH_CONCURRENCY);

    while let Some((pair, fetched)) = fetches.next().await {
        stats.attempted += 1;
        match fetched {
            Ok(doc) => {
                let url = store
                    .upload(&pair.blob_path(), &doc, CACHE_CONTROL_HAULING)
                    .await
                    .with_context(|| format!("publishing hauling snapshot for {pair}"))?;
                info!("[WARM] published {} -> {}", pair, url);
                stats.published += 1;
            }
            Err(e) => {
                warn!("[WARM] cache miss for {}: {:#}", pair, e);
                stats.skipped += 1;
            }
        }
    }

    info!(
        "[WARM] run complete: {} attempted, {} published, {} skipped",
        stats.attempted, stats.published, stats.skipped
    );
    Ok(stats)
}
