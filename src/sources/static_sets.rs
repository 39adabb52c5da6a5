//! Static-collection fallback source for regions with market activity.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use tracing::warn;

use crate::config::HTTP_TIMEOUT_SECS;
use crate::resolver::SourceProvider;
use crate::types::RegionId;

/// A station or structure record. Only the region id is consumed.
#[derive(Deserialize)]
struct LocationRecord {
    #[serde(default)]
    region_id: Option<RegionId>,
}

/// Fallback source: union of the NPC station list and the player structure
/// list. Each collection is independently best-effort; a failed fetch
/// contributes zero region ids without preventing the other from contributing.
pub struct StaticCollectionsSource {
    http: reqwest::Client,
    stations_url: String,
    structures_url: String,
}

impl StaticCollectionsSource {
    pub fn new(stations_url: &str, structures_url: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            stations_url: stations_url.to_string(),
            structures_url: structures_url.to_string(),
        }
    }

    async fn fetch_region_ids(&self, url: &str) -> Result<Vec<RegionId>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetching {url}"))?;
        if !resp.status().is_success() {
            bail!("{} returned {}", url, resp.status());
        }

        let records: Vec<LocationRecord> = resp
            .json()
            .await
            .with_context(|| format!("decoding location collection {url}"))?;
        Ok(records
            .into_iter()
            .filter_map(|r| r.region_id)
            .filter(|&id| id != 0)
            .collect())
    }
}

#[async_trait]
impl SourceProvider<Vec<RegionId>> for StaticCollectionsSource {
    fn name(&self) -> &'static str {
        "static_collections"
    }

    async fn attempt(&self) -> Result<Option<Vec<RegionId>>> {
        let mut regions: FxHashSet<RegionId> = FxHashSet::default();

        for url in [&self.stations_url, &self.structures_url] {
            match self.fetch_region_ids(url).await {
                Ok(ids) => regions.extend(ids),
                Err(e) => warn!("[REGIONS] static collection skipped: {:#}", e),
            }
        }

        if regions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(regions.into_iter().collect()))
        }
    }
}
