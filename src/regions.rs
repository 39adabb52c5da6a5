//! Region market index: which regions have any market activity at all.
//!
//! Rebuilt from scratch on every run from the source chain (relational
//! aggregate first, static collections last) and published as a single
//! sorted, deduplicated snapshot.

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use crate::blob::BlobStore;
use crate::config::CACHE_CONTROL_REGIONS;
use crate::resolver::{resolve, SourceProvider};
use crate::types::RegionId;

/// Blob path of the published index.
pub const REGION_INDEX_PATH: &str = "regions/with-markets.json";

/// Resolve the source chain, normalize, and publish the index.
///
/// Source failures never surface here; an exhausted chain publishes an empty
/// index. A publish failure is fatal and propagates to the scheduler.
pub async fn build_and_publish(
    providers: &[Box<dyn SourceProvider<Vec<RegionId>>>],
    store: &dyn BlobStore,
) -> Result<Vec<RegionId>> {
    let mut regions = resolve(providers).await.unwrap_or_default();
    regions.sort_unstable();
    regions.dedup();

    info!("[REGIONS] {} regions with market activity", regions.len());

    let payload = json!({
        "regions": regions,
        "generated_at": chrono::Utc::now().to_rfc3339(),
    });
    let url = store
        .upload(REGION_INDEX_PATH, &payload, CACHE_CONTROL_REGIONS)
        .await
        .context("publishing region market index")?;
    info!("[REGIONS] published {}", url);

    Ok(regions)
}
