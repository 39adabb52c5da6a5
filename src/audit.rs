//! Snapshot health audit against the canonical archive.
//!
//! Read-only side channel: for each target region, fetch the archived
//! snapshot and report existence and freshness. Nothing here touches any
//! cache; the report is the only output.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::{ARCHIVE_RATE_LIMIT_PER_SEC, HTTP_TIMEOUT_SECS};
use crate::types::RegionId;

/// An archived per-region snapshot, as much of it as the audit consumes.
#[derive(Debug, Deserialize)]
pub struct ArchiveSnapshot {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub best_quotes: Map<String, Value>,
}

/// Outcome of one archive lookup. A clean 404 is a fact about the archive,
/// not an error; everything else non-success is.
#[derive(Debug)]
pub enum ArchiveStatus {
    Found(ArchiveSnapshot),
    NotFound,
}

/// Canonical archive reader.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    async fn fetch_snapshot(&self, region: RegionId) -> Result<ArchiveStatus>;
}

/// Archive client reading `<base>/<region id>.json`.
pub struct ArchiveClient {
    http: reqwest::Client,
    base_url: String,
}

impl ArchiveClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ArchiveSource for ArchiveClient {
    async fn fetch_snapshot(&self, region: RegionId) -> Result<ArchiveStatus> {
        let url = format!("{}/{}.json", self.base_url, region);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetching archive snapshot for region {region}"))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(ArchiveStatus::NotFound);
        }
        if !resp.status().is_success() {
            bail!("archive returned {} for region {}", resp.status(), region);
        }

        let snapshot: ArchiveSnapshot = resp
            .json()
            .await
            .with_context(|| format!("decoding archive snapshot for region {region}"))?;
        Ok(ArchiveStatus::Found(snapshot))
    }
}

/// Per-region audit outcome. Optional fields are absent, not null, when
/// unset; a clean not-found carries no error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub region_id: RegionId,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_types: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated audit report. `missing` lists every target whose snapshot
/// existence could not be confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub checked: usize,
    pub missing: Vec<RegionId>,
    pub results: Vec<HealthRecord>,
}

/// Audit each target region against the canonical archive.
///
/// The sweep is strictly sequential and rate-limited on purpose: the archive
/// host throttles aggressively, and the audit must never contribute to that.
/// Per-region failures are recorded inline; the audit itself never errors.
pub async fn audit(targets: &[RegionId], archive: &dyn ArchiveSource) -> AuditReport {
    let rate = NonZeroU32::new(ARCHIVE_RATE_LIMIT_PER_SEC).expect("rate limit must be non-zero");
    let limiter = RateLimiter::direct(Quota::per_second(rate));

    let mut results = Vec::with_capacity(targets.len());
    let mut missing = Vec::new();

    for &region in targets {
        limiter.until_ready().await;

        match archive.fetch_snapshot(region).await {
            Ok(ArchiveStatus::Found(snapshot)) => {
                results.push(HealthRecord {
                    region_id: region,
                    exists: true,
                    count_types: Some(snapshot.best_quotes.len()),
                    last_updated: snapshot.last_updated,
                    error: None,
                });
            }
            Ok(ArchiveStatus::NotFound) => {
                info!("[AUDIT] region {} missing from archive", region);
                missing.push(region);
                results.push(HealthRecord {
                    region_id: region,
                    exists: false,
                    last_updated: None,
                    count_types: None,
                    error: None,
                });
            }
            Err(e) => {
                warn!("[AUDIT] region {} check failed: {:#}", region, e);
                missing.push(region);
                results.push(HealthRecord {
                    region_id: region,
                    exists: false,
                    last_updated: None,
                    count_types: None,
                    error: Some(format!("{e:#}")),
                });
            }
        }
    }

    AuditReport { checked: results.len(), missing, results }
}
