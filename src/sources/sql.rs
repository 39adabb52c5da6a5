//! Relational aggregate source for regions with market activity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};

use crate::resolver::SourceProvider;
use crate::types::RegionId;

/// Distinct region ids carrying a non-null best-buy or best-sell price in the
/// `aggregated_orders` table.
const REGIONS_WITH_MARKETS_SQL: &str = "SELECT DISTINCT region_id FROM aggregated_orders \
     WHERE best_buy_price IS NOT NULL OR best_sell_price IS NOT NULL";

/// Primary source: the relational aggregate built by the order ingest job.
///
/// "Database unreachable" and "table empty" are treated identically: the chain
/// falls through to the static collections either way.
pub struct SqlAggregateSource {
    db_path: String,
}

impl SqlAggregateSource {
    pub fn new(db_path: &str) -> Self {
        Self { db_path: db_path.to_string() }
    }
}

#[async_trait]
impl SourceProvider<Vec<RegionId>> for SqlAggregateSource {
    fn name(&self) -> &'static str {
        "sql_aggregate"
    }

    async fn attempt(&self) -> Result<Option<Vec<RegionId>>> {
        let db_path = self.db_path.clone();

        // rusqlite is synchronous; keep it off the async runtime.
        let ids = tokio::task::spawn_blocking(move || -> Result<Vec<RegionId>> {
            // Read-only open: a missing database file is an error here, not an
            // implicitly created empty one.
            let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
                .with_context(|| format!("opening aggregate database {db_path}"))?;

            let mut stmt = conn
                .prepare(REGIONS_WITH_MARKETS_SQL)
                .context("preparing regions-with-markets query")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, i64>(0))
                .context("querying aggregated_orders")?;

            let mut ids = Vec::new();
            for row in rows {
                if let Ok(id) = RegionId::try_from(row.context("reading region_id row")?) {
                    if id != 0 {
                        ids.push(id);
                    }
                }
            }
            Ok(ids)
        })
        .await
        .context("aggregate query task panicked")??;

        Ok(if ids.is_empty() { None } else { Some(ids) })
    }
}
