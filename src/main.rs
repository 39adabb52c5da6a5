//! Scheduled snapshot refresh run.
//!
//! One invocation warms the configured hot-pair snapshots and rebuilds the
//! region market index. Per-item upstream failures are logged and skipped;
//! a blob store failure aborts the run with a non-zero exit so the scheduler
//! records it as failed and retries on its own cadence.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use market_snapshots::blob::HttpBlobStore;
use market_snapshots::config::Config;
use market_snapshots::hauling::{populate, HaulingApiClient};
use market_snapshots::regions::build_and_publish;
use market_snapshots::resolver::SourceProvider;
use market_snapshots::sources::{SqlAggregateSource, StaticCollectionsSource};
use market_snapshots::types::RegionId;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with both stdout and file output
    let file_appender = tracing_appender::rolling::never(".", "refresh.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("market_snapshots=info".parse().unwrap());

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    info!("Market snapshot refresh run");
    info!("   Hauling API: {}", config.api_base);
    info!("   Blob store: {}", config.blob_base);
    info!("   Hot pairs: {}", config.hot_pairs.len());
    info!("   Hub regions: {:?}", config.hub_regions);

    let store = HttpBlobStore::new(
        &config.blob_base,
        &config.blob_public_base,
        config.blob_token.clone(),
    );

    // Warm set first: the hauling pairs are what the front end hits hardest.
    let routes = HaulingApiClient::new(&config.api_base, config.route_limit);
    let stats = populate(&config.hot_pairs, &routes, &store).await?;

    // Region market index: SQL aggregate first, static collections last.
    let providers: Vec<Box<dyn SourceProvider<Vec<RegionId>>>> = vec![
        Box::new(SqlAggregateSource::new(&config.market_db_path)),
        Box::new(StaticCollectionsSource::new(
            &config.stations_url,
            &config.structures_url,
        )),
    ];
    let regions = build_and_publish(&providers, &store).await?;

    info!(
        "Refresh complete: {}/{} hauling snapshots published, {} regions indexed",
        stats.published,
        stats.attempted,
        regions.len()
    );
    Ok(())
}
