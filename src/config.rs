//! Run configuration and cache policy definitions.
//!
//! Policy values (cache lifetimes, timeouts, rate limits, default hub regions
//! and hot pairs) are constants here; everything environment-specific is read
//! once at run start by [`Config::from_env`] with documented defaults.

use crate::types::{cross_pairs, HotPair, RegionId};

// === Trade hub regions ===

/// The Forge (Jita) - busiest market region by a wide margin
pub const THE_FORGE: RegionId = 10000002;

/// Heimatar (Rens)
pub const HEIMATAR: RegionId = 10000030;

/// Sinq Laison (Dodixie)
pub const SINQ_LAISON: RegionId = 10000032;

/// Metropolis (Hek)
pub const METROPOLIS: RegionId = 10000042;

/// Domain (Amarr) - second-largest market after The Forge
pub const DOMAIN: RegionId = 10000043;

/// Default hub regions audited for snapshot health.
pub const DEFAULT_HUB_REGIONS: &[RegionId] =
    &[THE_FORGE, HEIMATAR, SINQ_LAISON, METROPOLIS, DOMAIN];

/// Hand-curated hot pairs warmed on every refresh run. Routes in and out of
/// The Forge dominate front-end traffic, so only those are pre-warmed.
pub const DEFAULT_HOT_PAIRS: &[(RegionId, RegionId)] = &[
    (THE_FORGE, DOMAIN),
    (DOMAIN, THE_FORGE),
    (THE_FORGE, SINQ_LAISON),
    (SINQ_LAISON, THE_FORGE),
    (THE_FORGE, HEIMATAR),
    (HEIMATAR, THE_FORGE),
    (THE_FORGE, METROPOLIS),
    (METROPOLIS, THE_FORGE),
];

// === Cache policy ===

/// Cache lifetime for hauling pair snapshots (30 minutes).
pub const CACHE_CONTROL_HAULING: &str = "public, max-age=1800";

/// Cache lifetime for the region market index (1 hour).
pub const CACHE_CONTROL_REGIONS: &str = "public, max-age=3600";

// === Outbound request policy ===

/// Timeout for every outbound fetch, so a stalled upstream cannot hang a
/// scheduled run.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Routes requested per hauling pair snapshot.
pub const DEFAULT_ROUTE_LIMIT: u32 = 30;

/// Archive host rate limit (requests per second). The canonical archive host
/// rate-limits aggressively, so the audit sweep stays well under it.
pub const ARCHIVE_RATE_LIMIT_PER_SEC: u32 = 2;

/// Concurrent warm-set fetches. Hot-pair counts are single digits and the
/// upstream API is shared with live traffic; 1 keeps the load bounded.
pub const WARM_FETCH_CONCURRENCY: usize = 1;

/// Run configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the live hauling query API.
    pub api_base: String,

    /// Blob store write endpoint.
    pub blob_base: String,

    /// Public URL prefix readers use for published blobs.
    pub blob_public_base: String,

    /// Optional bearer token for blob writes.
    pub blob_token: Option<String>,

    /// Path to the sqlite database holding the `aggregated_orders` table.
    pub market_db_path: String,

    /// NPC station collection URL (static fallback source).
    pub stations_url: String,

    /// Player structure collection URL (static fallback source).
    pub structures_url: String,

    /// Canonical archive base URL; `<archive_base>/<region id>.json`.
    pub archive_base: String,

    /// Hub regions audited by default.
    pub hub_regions: Vec<RegionId>,

    /// Hot pairs warmed on every refresh run.
    pub hot_pairs: Vec<HotPair>,

    /// Routes requested per hauling pair.
    pub route_limit: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let api_base = env_or("HAULING_API_BASE", "http://localhost:3000/api");
        let blob_base = env_or("BLOB_STORE_URL", "http://localhost:9000/snapshots");
        let blob_public_base = std::env::var("BLOB_PUBLIC_BASE")
            .ok()
            .unwrap_or_else(|| blob_base.clone());

        let hub_regions = std::env::var("HUB_REGIONS")
            .ok()
            .map(|v| parse_region_list(&v))
            .filter(|regions| !regions.is_empty())
            .unwrap_or_else(|| DEFAULT_HUB_REGIONS.to_vec());

        let hot_pairs = match std::env::var("HOT_PAIRS").ok().as_deref() {
            // "hubs" synthesizes every ordered pair between the hub regions
            Some("hubs") => cross_pairs(&hub_regions),
            Some(csv) => parse_pair_list(csv),
            None => default_hot_pairs(),
        };

        let stations_url = std::env::var("STATIONS_URL")
            .ok()
            .unwrap_or_else(|| format!("{api_base}/static/npc-stations.json"));
        let structures_url = std::env::var("STRUCTURES_URL")
            .ok()
            .unwrap_or_else(|| format!("{api_base}/static/structures.json"));

        Self {
            api_base,
            blob_base,
            blob_public_base,
            blob_token: std::env::var("BLOB_STORE_TOKEN").ok().filter(|t| !t.is_empty()),
            market_db_path: env_or("MARKET_DB_PATH", "market.db"),
            stations_url,
            structures_url,
            archive_base: archive_base_from_env(),
            hub_regions,
            hot_pairs,
            route_limit: std::env::var("ROUTE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_ROUTE_LIMIT),
        }
    }
}

/// The default hot pairs as constructed pairs. The constant list is
/// hand-curated, but it still goes through `HotPair::new` so a bad edit can
/// never smuggle a self-pair into the warm set.
pub fn default_hot_pairs() -> Vec<HotPair> {
    DEFAULT_HOT_PAIRS
        .iter()
        .filter_map(|&(from, to)| HotPair::new(from, to))
        .collect()
}

/// Archive base URL: explicit override, or composed from the owner/repo/branch
/// of the archive repository.
fn archive_base_from_env() -> String {
    if let Ok(base) = std::env::var("ARCHIVE_BASE_URL") {
        return base;
    }
    let owner = env_or("ARCHIVE_OWNER", "eve-market");
    let repo = env_or("ARCHIVE_REPO", "market-archive");
    let branch = env_or("ARCHIVE_BRANCH", "main");
    format!("https://raw.githubusercontent.com/{owner}/{repo}/{branch}/snapshots")
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().unwrap_or_else(|| default.to_string())
}

/// Parse a comma-separated region id list, dropping zero and unparseable
/// entries.
pub fn parse_region_list(csv: &str) -> Vec<RegionId> {
    csv.split(',')
        .filter_map(|token| token.trim().parse::<RegionId>().ok())
        .filter(|&id| id != 0)
        .collect()
}

/// Parse a comma-separated `from-to` pair list, dropping malformed tokens and
/// self-pairs.
pub fn parse_pair_list(csv: &str) -> Vec<HotPair> {
    csv.split(',').filter_map(HotPair::parse).collect()
}

// =============================================================================
// TESTS
// =============================================================================
