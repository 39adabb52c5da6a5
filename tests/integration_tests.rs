// tests/integration_tests.rs
// Holistic integration tests for the snapshot pipeline
//
// These tests verify the full flow:
// 1. Warm-set population (per-pair failure isolation, publish policy)
// 2. Region market index fallback chain and normalization
// 3. Snapshot health audit report shape
// 4. The relational aggregate source against a real sqlite file

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use market_snapshots::audit::{audit, ArchiveSnapshot, ArchiveSource, ArchiveStatus};
use market_snapshots::blob::BlobStore;
use market_snapshots::config::{CACHE_CONTROL_HAULING, CACHE_CONTROL_REGIONS};
use market_snapshots::hauling::{populate, RouteSource};
use market_snapshots::regions::{build_and_publish, REGION_INDEX_PATH};
use market_snapshots::resolver::SourceProvider;
use market_snapshots::sources::SqlAggregateSource;
use market_snapshots::types::{HotPair, RegionId};

// ============================================================================
// TEST DOUBLES
// ============================================================================

#[derive(Debug, Clone)]
struct BlobWrite {
    path: String,
    value: Value,
    cache_control: String,
}

/// In-memory blob store recording every write.
#[derive(Default)]
struct MemoryBlobStore {
    writes: Mutex<Vec<BlobWrite>>,
}

impl MemoryBlobStore {
    fn writes(&self) -> Vec<BlobWrite> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, value: &Value, cache_control: &str) -> Result<String> {
        self.writes.lock().unwrap().push(BlobWrite {
            path: path.to_string(),
            value: value.clone(),
            cache_control: cache_control.to_string(),
        });
        Ok(format!("mem://{path}"))
    }
}

/// Blob store simulating a store outage.
struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload(&self, _path: &str, _value: &Value, _cache_control: &str) -> Result<String> {
        bail!("blob store unreachable")
    }
}

/// Route source with a scripted outcome per pair; unknown pairs fail.
struct StubRouteSource {
    outcomes: HashMap<HotPair, Result<Value, String>>,
    attempts: AtomicUsize,
}

impl StubRouteSource {
    fn new(outcomes: Vec<(HotPair, Result<Value, String>)>) -> Self {
        Self { outcomes: outcomes.into_iter().collect(), attempts: AtomicUsize::new(0) }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteSource for StubRouteSource {
    async fn fetch_routes(&self, pair: &HotPair) -> Result<Value> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.get(pair) {
            Some(Ok(doc)) => Ok(doc.clone()),
            Some(Err(msg)) => Err(anyhow!("{msg}")),
            None => Err(anyhow!("no scripted outcome for {pair}")),
        }
    }
}

/// Region provider with a fixed outcome and an attempt counter.
struct StubRegionProvider {
    name: &'static str,
    outcome: Result<Option<Vec<RegionId>>, String>,
    attempts: AtomicUsize,
}

impl StubRegionProvider {
    fn boxed(
        name: &'static str,
        outcome: Result<Option<Vec<RegionId>>, String>,
    ) -> Box<dyn SourceProvider<Vec<RegionId>>> {
        Box::new(Self { name, outcome, attempts: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl SourceProvider<Vec<RegionId>> for StubRegionProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn attempt(&self) -> Result<Option<Vec<RegionId>>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(ids) => Ok(ids.clone()),
            Err(msg) => Err(anyhow!("{msg}")),
        }
    }
}

/// Scripted archive outcomes per region.
enum StubArchiveOutcome {
    Found { last_updated: Option<String>, quote_types: usize },
    NotFound,
    Fail(&'static str),
}

struct StubArchive {
    outcomes: HashMap<RegionId, StubArchiveOutcome>,
}

#[async_trait]
impl ArchiveSource for StubArchive {
    async fn fetch_snapshot(&self, region: RegionId) -> Result<ArchiveStatus> {
        match self.outcomes.get(&region) {
            Some(StubArchiveOutcome::Found { last_updated, quote_types }) => {
                let mut best_quotes = Map::new();
                for type_id in 0..*quote_types {
                    best_quotes.insert(format!("{}", 34 + type_id), json!({"buy": 5.0, "sell": 5.5}));
                }
                Ok(ArchiveStatus::Found(ArchiveSnapshot {
                    last_updated: last_updated.clone(),
                    best_quotes,
                }))
            }
            Some(StubArchiveOutcome::NotFound) | None => Ok(ArchiveStatus::NotFound),
            Some(StubArchiveOutcome::Fail(msg)) => Err(anyhow!("{msg}")),
        }
    }
}

fn pair(from: RegionId, to: RegionId) -> HotPair {
    HotPair::new(from, to).expect("test pair must be valid")
}

fn route_doc(n: usize) -> Value {
    json!({ "routes": (0..n).map(|i| json!({"type_id": 34 + i})).collect::<Vec<_>>() })
}

// ============================================================================
// WARM SET TESTS - Per-pair isolation and publish policy
// ============================================================================

mod warm_set_tests {
    use super::*;

    #[tokio::test]
    async fn test_populate_attempts_every_pair() {
        let pairs = vec![pair(10000002, 10000043), pair(10000043, 10000002), pair(10000002, 10000030)];
        let source = StubRouteSource::new(vec![
            (pairs[0], Ok(route_doc(3))),
            (pairs[1], Err("upstream 502".to_string())),
            (pairs[2], Ok(route_doc(1))),
        ]);
        let store = MemoryBlobStore::default();

        let stats = populate(&pairs, &source, &store).await.expect("populate succeeds");

        assert_eq!(source.attempts(), pairs.len(), "every pair attempted exactly once");
        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.skipped, 1);

        let writes = store.writes();
        assert_eq!(writes.len(), 2, "only successful fetches publish");
        assert_eq!(writes[0].path, "hauling/10000002-10000043.json");
        assert_eq!(writes[0].cache_control, CACHE_CONTROL_HAULING);
        assert_eq!(writes[0].value, route_doc(3), "published document is the fetched payload");
        assert_eq!(writes[1].path, "hauling/10000002-10000030.json");
    }

    #[tokio::test]
    async fn test_populate_continues_past_leading_failure() {
        let pairs = vec![pair(10000002, 10000043), pair(10000002, 10000032)];
        let source = StubRouteSource::new(vec![
            (pairs[0], Err("timeout".to_string())),
            (pairs[1], Ok(route_doc(2))),
        ]);
        let store = MemoryBlobStore::default();

        let stats = populate(&pairs, &source, &store).await.expect("populate succeeds");

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.published, 1);
        assert_eq!(store.writes()[0].path, "hauling/10000002-10000032.json");
    }

    #[tokio::test]
    async fn test_populate_publish_failure_aborts_run() {
        let pairs = vec![pair(10000002, 10000043)];
        let source = StubRouteSource::new(vec![(pairs[0], Ok(route_doc(1)))]);

        let result = populate(&pairs, &source, &FailingBlobStore).await;

        assert!(result.is_err(), "a blob store outage must fail the run, not be swallowed");
    }

    #[tokio::test]
    async fn test_populate_empty_warm_set() {
        let source = StubRouteSource::new(vec![]);
        let store = MemoryBlobStore::default();

        let stats = populate(&[], &source, &store).await.expect("populate succeeds");

        assert_eq!(stats.attempted, 0);
        assert!(store.writes().is_empty());
    }
}

// ============================================================================
// REGION INDEX TESTS - Fallback chain and normalization
// ============================================================================

mod region_index_tests {
    use super::*;

    #[tokio::test]
    async fn test_index_prefers_primary_source() {
        let providers = vec![
            StubRegionProvider::boxed("sql", Ok(Some(vec![10000043, 10000002, 10000043, 10000030]))),
            StubRegionProvider::boxed("static", Ok(Some(vec![99999999]))),
        ];
        let store = MemoryBlobStore::default();

        let regions = build_and_publish(&providers, &store).await.expect("build succeeds");

        assert_eq!(regions, vec![10000002, 10000030, 10000043], "sorted ascending, deduplicated");

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path, REGION_INDEX_PATH);
        assert_eq!(writes[0].cache_control, CACHE_CONTROL_REGIONS);
        assert_eq!(writes[0].value["regions"], json!([10000002, 10000030, 10000043]));
        assert!(writes[0].value["generated_at"].is_string());
    }

    #[tokio::test]
    async fn test_index_falls_back_when_sql_unavailable() {
        let providers = vec![
            StubRegionProvider::boxed("sql", Err("database unreachable".to_string())),
            StubRegionProvider::boxed("static", Ok(Some(vec![10000032, 10000002]))),
        ];
        let store = MemoryBlobStore::default();

        let regions = build_and_publish(&providers, &store).await.expect("sql failure never propagates");

        assert_eq!(regions, vec![10000002, 10000032]);
    }

    #[tokio::test]
    async fn test_index_empty_when_all_sources_exhausted() {
        let providers = vec![
            StubRegionProvider::boxed("sql", Err("no such table".to_string())),
            StubRegionProvider::boxed("static", Ok(None)),
        ];
        let store = MemoryBlobStore::default();

        let regions = build_and_publish(&providers, &store).await.expect("exhausted chain still publishes");

        assert!(regions.is_empty());
        assert_eq!(store.writes()[0].value["regions"], json!([]), "empty index still published");
    }

    #[tokio::test]
    async fn test_index_publish_failure_propagates() {
        let providers = vec![StubRegionProvider::boxed("sql", Ok(Some(vec![10000002])))];

        let result = build_and_publish(&providers, &FailingBlobStore).await;

        assert!(result.is_err(), "infra failure must surface to the scheduler");
    }
}

// ============================================================================
// AUDIT TESTS - Report shape and per-item error capture
// ============================================================================

mod audit_tests {
    use super::*;

    #[tokio::test]
    async fn test_audit_empty_targets() {
        let archive = StubArchive { outcomes: HashMap::new() };

        let report = audit(&[], &archive).await;

        assert_eq!(report.checked, 0);
        assert!(report.missing.is_empty());
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_audit_reports_missing_region() {
        let archive = StubArchive {
            outcomes: HashMap::from([
                (
                    10000002,
                    StubArchiveOutcome::Found {
                        last_updated: Some("2026-08-07T00:00:00Z".to_string()),
                        quote_types: 4,
                    },
                ),
                (99999999, StubArchiveOutcome::NotFound),
            ]),
        };

        let report = audit(&[10000002, 99999999], &archive).await;

        assert_eq!(report.checked, 2);
        assert_eq!(report.missing, vec![99999999]);
        assert_eq!(report.results.len(), 2);

        let hub = &report.results[0];
        assert!(hub.exists);
        assert_eq!(hub.count_types, Some(4));
        assert_eq!(hub.last_updated.as_deref(), Some("2026-08-07T00:00:00Z"));
        assert!(hub.error.is_none());

        let gone = &report.results[1];
        assert!(!gone.exists);
        assert!(gone.error.is_none(), "a clean 404 is not an error");

        // Absent fields stay absent on the wire, not null.
        let serialized = serde_json::to_value(gone).unwrap();
        assert!(serialized.get("error").is_none());
        assert!(serialized.get("last_updated").is_none());
    }

    #[tokio::test]
    async fn test_audit_records_transport_failure_inline() {
        let archive = StubArchive {
            outcomes: HashMap::from([(10000030, StubArchiveOutcome::Fail("503 service unavailable"))]),
        };

        let report = audit(&[10000030], &archive).await;

        assert_eq!(report.missing, vec![10000030]);
        let record = &report.results[0];
        assert!(!record.exists);
        let error = record.error.as_deref().expect("transport failure recorded inline");
        assert!(error.contains("503"), "error message preserved: {error}");
    }

    #[tokio::test]
    async fn test_audit_count_types_zero_when_quotes_absent() {
        let archive = StubArchive {
            outcomes: HashMap::from([(
                10000042,
                StubArchiveOutcome::Found { last_updated: None, quote_types: 0 },
            )]),
        };

        let report = audit(&[10000042], &archive).await;

        assert_eq!(report.results[0].count_types, Some(0));
        assert!(report.missing.is_empty());
    }
}

// ============================================================================
// SQL SOURCE TESTS - Aggregate table against a real sqlite file
// ============================================================================

mod sql_source_tests {
    use super::*;
    use rusqlite::Connection;

    fn seeded_db(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("market.db");
        let conn = Connection::open(&path).expect("create test db");
        conn.execute_batch(
            "CREATE TABLE aggregated_orders (
                region_id INTEGER NOT NULL,
                type_id INTEGER NOT NULL,
                best_buy_price REAL,
                best_sell_price REAL
            );
            INSERT INTO aggregated_orders VALUES (10000043, 34, 4.2, NULL);
            INSERT INTO aggregated_orders VALUES (10000002, 34, 5.0, 5.5);
            INSERT INTO aggregated_orders VALUES (10000002, 35, NULL, 11.0);
            INSERT INTO aggregated_orders VALUES (10000099, 34, NULL, NULL);",
        )
        .expect("seed test db");
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_sql_source_yields_distinct_active_regions() {
        let dir = tempfile::tempdir().unwrap();
        let source = SqlAggregateSource::new(&seeded_db(&dir));

        let mut regions = source.attempt().await.expect("query succeeds").expect("rows found");
        regions.sort_unstable();

        assert_eq!(regions, vec![10000002, 10000043], "distinct regions with any non-null price");
    }

    #[tokio::test]
    async fn test_sql_source_empty_table_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE aggregated_orders (
                region_id INTEGER NOT NULL,
                type_id INTEGER NOT NULL,
                best_buy_price REAL,
                best_sell_price REAL
            );",
        )
        .unwrap();

        let source = SqlAggregateSource::new(&path.to_string_lossy());

        let result = source.attempt().await.expect("empty table is not an error");
        assert!(result.is_none(), "zero rows means fall through to the next source");
    }

    #[tokio::test]
    async fn test_sql_source_missing_database_errors() {
        let source = SqlAggregateSource::new("/nonexistent/market.db");

        assert!(source.attempt().await.is_err(), "resolve turns this into a fall-through");
    }

    #[tokio::test]
    async fn test_sql_source_missing_table_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.db");
        Connection::open(&path).unwrap(); // creates an empty database

        let source = SqlAggregateSource::new(&path.to_string_lossy());

        assert!(source.attempt().await.is_err(), "missing table behaves like an unreachable source");
    }
}
