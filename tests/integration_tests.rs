//! End-to-end tests for the all-time report loader, driven through an
//! in-memory data host.

use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use guessr_leaderboard::analytics::loader::{AlltimeService, LoadConfig, ReportSource};
use guessr_leaderboard::services::DataHost;

/// Fetch counters, shared with the test after the host moves into the
/// service.
#[derive(Clone, Default)]
struct FetchCounts {
    index: Arc<AtomicUsize>,
    days: Arc<AtomicUsize>,
}

#[derive(Default)]
struct MockHost {
    index: Option<Value>,
    days: HashMap<String, Value>,
    failing_days: HashSet<String>,
    snapshot: Option<Value>,
    counts: FetchCounts,
}

impl MockHost {
    fn with_index(dates: &[&str]) -> Self {
        Self {
            index: Some(json!(dates)),
            ..Self::default()
        }
    }

    fn day(mut self, date: &str, payload: Value) -> Self {
        self.days.insert(date.to_string(), payload);
        self
    }

    fn failing_day(mut self, date: &str) -> Self {
        self.failing_days.insert(date.to_string());
        self
    }

    fn snapshot(payload: Value) -> Self {
        Self {
            snapshot: Some(payload),
            ..Self::default()
        }
    }

    fn counts(&self) -> FetchCounts {
        self.counts.clone()
    }
}

#[async_trait::async_trait]
impl DataHost for MockHost {
    async fn fetch_index(&self) -> Result<Value> {
        self.counts.index.fetch_add(1, Ordering::SeqCst);
        match &self.index {
            Some(index) => Ok(index.clone()),
            None => bail!("GET /index.json returned status 500"),
        }
    }

    async fn fetch_day(&self, date: &str) -> Result<Value> {
        self.counts.days.fetch_add(1, Ordering::SeqCst);
        if self.failing_days.contains(date) {
            bail!("GET /{date}/leaderboard.json returned status 404");
        }
        Ok(self.days.get(date).cloned().unwrap_or_else(|| json!([])))
    }

    async fn fetch_snapshot(&self) -> Result<Value> {
        match &self.snapshot {
            Some(snapshot) => Ok(snapshot.clone()),
            None => bail!("GET /alltime.json returned status 404"),
        }
    }
}

fn service(host: MockHost) -> AlltimeService<MockHost> {
    AlltimeService::new(host, LoadConfig::default())
}

#[tokio::test]
async fn test_day_sweep_builds_ranked_report() {
    let host = MockHost::with_index(&["2024-01-02", "2024-01-01"])
        .day("2024-01-01", json!([{"username": "alice", "score": 100}]))
        .day(
            "2024-01-02",
            // Wrapped payload shape, as the live host serves it.
            json!({"friendData": [
                {"username": "alice", "score": 50},
                {"username": "bob", "score": 200}
            ]}),
        );

    let report = service(host).load().await.unwrap();

    // Index arrives unsorted; the report's dates are sorted ascending.
    assert_eq!(report.dates, vec!["2024-01-01", "2024-01-02"]);

    assert_eq!(report.users[0].username, "bob");
    assert_eq!(report.users[0].total, 200);
    assert_eq!(report.users[0].days, 1);
    assert_eq!(report.users[0].rank, 1);
    assert_eq!(report.users[1].username, "alice");
    assert_eq!(report.users[1].total, 150);
    assert_eq!(report.users[1].days, 2);
    assert_eq!(report.users[1].rank, 2);

    let alice = report.top_user("alice").unwrap();
    assert_eq!(alice.cumulative, vec![100, 150]);
    assert_eq!(alice.mean_series, vec![Some(100.0), Some(75.0)]);
}

#[tokio::test]
async fn test_failed_day_contributes_zero_rows() {
    let day1 = json!([{"username": "alice", "score": 100}]);

    let with_failure = MockHost::with_index(&["2024-01-01", "2024-01-02"])
        .day("2024-01-01", day1.clone())
        .failing_day("2024-01-02");
    let without_day = MockHost::with_index(&["2024-01-01"]).day("2024-01-01", day1);

    let broken = service(with_failure).load().await.unwrap();
    let reference = service(without_day).load().await.unwrap();

    // One bad day never blocks the report or disturbs other days' totals.
    assert_eq!(broken.users, reference.users);
    assert_eq!(broken.dates.len(), 2);
}

#[tokio::test]
async fn test_empty_index_yields_empty_report() {
    let report = service(MockHost::with_index(&[])).load().await.unwrap();
    assert!(report.dates.is_empty());
    assert!(report.users.is_empty());
    assert!(report.top_users.is_empty());
}

#[tokio::test]
async fn test_index_failure_is_fatal_and_names_the_resource() {
    let host = MockHost::default();
    let counts = host.counts();
    let svc = service(host);

    let err = svc.load().await.unwrap_err();
    assert!(format!("{err:#}").contains("index.json"));

    // The failure leaves no poisoned cache entry: a retry hits the host
    // again instead of reusing anything.
    let _ = svc.load().await.unwrap_err();
    assert_eq!(counts.index.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_report_is_cached_until_refresh() {
    let host = MockHost::with_index(&["2024-01-01"])
        .day("2024-01-01", json!([{"username": "alice", "score": 10}]));
    let counts = host.counts();
    let svc = service(host);

    let first = svc.load().await.unwrap();
    let second = svc.load().await.unwrap();
    assert_eq!(first.generated_at, second.generated_at);
    assert_eq!(counts.index.load(Ordering::SeqCst), 1);

    let _ = svc.refresh().await.unwrap();
    assert_eq!(counts.index.load(Ordering::SeqCst), 2);
    assert_eq!(counts.days.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch_sweep() {
    let host = MockHost::with_index(&["2024-01-01", "2024-01-02", "2024-01-03"])
        .day("2024-01-01", json!([{"username": "alice", "score": 1}]))
        .day("2024-01-02", json!([{"username": "alice", "score": 2}]))
        .day("2024-01-03", json!([{"username": "bob", "score": 3}]));
    let counts = host.counts();
    // Batch size below the date count still covers every date.
    let config = LoadConfig {
        batch_size: 2,
        ..LoadConfig::default()
    };
    let svc = Arc::new(AlltimeService::new(host, config));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.load().await })
        })
        .collect();
    let mut stamps = Vec::new();
    for task in tasks {
        stamps.push(task.await.unwrap().unwrap().generated_at);
    }

    // Every caller saw the same report, built by a single sweep.
    assert!(stamps.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(counts.index.load(Ordering::SeqCst), 1);
    assert_eq!(counts.days.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_snapshot_source_round_trips_a_generated_report() {
    let sweep_host = MockHost::with_index(&["2024-01-01", "2024-01-02"])
        .day("2024-01-01", json!([{"username": "alice", "score": 100}]))
        .day(
            "2024-01-02",
            json!([{"username": "alice", "score": 50}, {"username": "bob", "score": 200}]),
        );
    let generated = service(sweep_host).load().await.unwrap();

    let snapshot = serde_json::to_value(&*generated).unwrap();
    let config = LoadConfig {
        source: ReportSource::Snapshot,
        ..LoadConfig::default()
    };
    let restored = AlltimeService::new(MockHost::snapshot(snapshot), config)
        .load()
        .await
        .unwrap();

    assert_eq!(restored.dates, generated.dates);
    assert_eq!(restored.users, generated.users);
    let alice = restored.top_user("alice").unwrap();
    assert_eq!(alice.cumulative, vec![100, 150]);
    // The memo starts empty on a restored report and fills on demand.
    assert_eq!(alice.rolling_average(2).len(), 2);
}

#[tokio::test]
async fn test_malformed_snapshot_is_rejected() {
    let config = LoadConfig {
        source: ReportSource::Snapshot,
        ..LoadConfig::default()
    };

    // Missing the users array entirely.
    let missing_fields = AlltimeService::new(
        MockHost::snapshot(json!({"dates": ["2024-01-01"]})),
        config.clone(),
    );
    let err = missing_fields.load().await.unwrap_err();
    assert!(format!("{err:#}").contains("invalid alltime.json payload"));

    // Series shorter than the date sequence.
    let misaligned = AlltimeService::new(
        MockHost::snapshot(json!({
            "dates": ["2024-01-01", "2024-01-02"],
            "users": [{"username": "alice", "total": 10, "days": 1, "rank": 1}],
            "topUsers": [{
                "username": "alice",
                "total": 10,
                "days": 1,
                "rank": 1,
                "dailyTotals": [10],
                "dailyScores": [10],
                "cumulative": [10],
                "meanSeries": [10.0],
                "firstPlayIndex": 0
            }],
            "generatedAt": "2024-02-01T00:00:00Z",
            "maxUsers": 10
        })),
        config,
    );
    let err = misaligned.load().await.unwrap_err();
    assert!(format!("{err:#}").contains("alice"));
}
