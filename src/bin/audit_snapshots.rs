//! One-shot snapshot health audit against the canonical archive.
//!
//! Usage: cargo run --bin audit_snapshots [region_id ...]
//!
//! Defaults to the configured hub regions when no ids are given. Prints the
//! JSON report to stdout; logs go to stderr so the output stays pipeable.

use anyhow::Result;

use market_snapshots::audit::{audit, ArchiveClient};
use market_snapshots::config::Config;
use market_snapshots::types::RegionId;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let targets: Vec<RegionId> = std::env::args()
        .skip(1)
        .filter_map(|arg| arg.trim().parse::<RegionId>().ok())
        .filter(|&id| id != 0)
        .collect();
    let targets = if targets.is_empty() { config.hub_regions.clone() } else { targets };

    let archive = ArchiveClient::new(&config.archive_base);
    let report = audit(&targets, &archive).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
