//! Core domain types for the snapshot pipeline.
//!
//! Region ids and hot pairs are the only values that flow through every
//! component, so they live here; wire payload types stay next to the client
//! that parses them.

use serde::{Deserialize, Serialize};

/// A trading region identifier. Always positive; zero is rejected wherever
/// values come from configuration parsing.
pub type RegionId = u32;

/// A curated directional (origin, destination) region pair pre-warmed into
/// cache on every refresh run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotPair {
    pub from: RegionId,
    pub to: RegionId,
}

impl HotPair {
    /// Build a pair, rejecting self-pairs and zero ids. Same-region routes are
    /// meaningless for hauling and must never reach the publish path.
    pub fn new(from: RegionId, to: RegionId) -> Option<Self> {
        if from == 0 || to == 0 || from == to {
            return None;
        }
        Some(Self { from, to })
    }

    /// Parse a `from-to` token, e.g. `10000002-10000043`.
    pub fn parse(token: &str) -> Option<Self> {
        let (from, to) = token.split_once('-')?;
        Self::new(from.trim().parse().ok()?, to.trim().parse().ok()?)
    }

    /// Deterministic blob path for this pair's snapshot.
    pub fn blob_path(&self) -> String {
        format!("hauling/{}-{}.json", self.from, self.to)
    }
}

impl std::fmt::Display for HotPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Synthesize every ordered pair between the given regions, skipping
/// self-pairs and duplicate inputs.
pub fn cross_pairs(regions: &[RegionId]) -> Vec<HotPair> {
    let mut unique: Vec<RegionId> = regions.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let mut pairs = Vec::with_capacity(unique.len().saturating_mul(unique.len().saturating_sub(1)));
    for &from in &unique {
        for &to in &unique {
            if let Some(pair) = HotPair::new(from, to) {
                pairs.push(pair);
            }
        }
    }
    pairs
}

// =============================================================================
// TESTS
// =============================================================================
