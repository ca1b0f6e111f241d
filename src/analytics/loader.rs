//! Report loading: day fan-out, snapshot path, caching.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analytics::aggregate::aggregate;
use crate::analytics::types::AlltimeReport;
use crate::normalize::{ScoreRow, normalize, normalize_index};
use crate::services::DataHost;

/// How many top users get full time series.
pub const DEFAULT_MAX_USERS: usize = 10;
/// How many day files are fetched simultaneously per batch.
pub const DEFAULT_BATCH_SIZE: usize = 6;

/// Where the report comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportSource {
    /// Fetch every day file and aggregate locally.
    #[default]
    Days,
    /// Load the host's precomputed `alltime.json`.
    Snapshot,
}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub max_users: usize,
    pub batch_size: usize,
    pub source: ReportSource,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_users: DEFAULT_MAX_USERS,
            batch_size: DEFAULT_BATCH_SIZE,
            source: ReportSource::Days,
        }
    }
}

/// Outcome of a single day fetch. A failed or unparseable day resolves to
/// [`DayOutcome::Unavailable`], which aggregates as zero rows; one bad day
/// must not block the rest of the report.
enum DayOutcome {
    Rows(Vec<ScoreRow>),
    Unavailable,
}

/// Builds and caches the all-time report.
///
/// The cache lock is held across a build, so concurrent `load` callers
/// attach to the same in-flight result instead of triggering a second
/// fetch sweep. A failed build leaves the cache empty and a later call
/// re-fetches.
pub struct AlltimeService<H> {
    host: Arc<H>,
    config: LoadConfig,
    cache: tokio::sync::Mutex<Option<Arc<AlltimeReport>>>,
}

impl<H: DataHost + 'static> AlltimeService<H> {
    pub fn new(host: H, config: LoadConfig) -> Self {
        Self {
            host: Arc::new(host),
            config,
            cache: tokio::sync::Mutex::new(None),
        }
    }

    /// Returns the cached report, or builds one.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<Arc<AlltimeReport>> {
        let mut cache = self.cache.lock().await;
        if let Some(report) = cache.as_ref() {
            debug!("Serving cached report");
            return Ok(report.clone());
        }

        let report = Arc::new(self.build().await?);
        *cache = Some(report.clone());
        Ok(report)
    }

    /// Discards the cache, then builds a fresh report.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<AlltimeReport>> {
        let mut cache = self.cache.lock().await;
        *cache = None;

        let report = Arc::new(self.build().await?);
        *cache = Some(report.clone());
        Ok(report)
    }

    async fn build(&self) -> Result<AlltimeReport> {
        match self.config.source {
            ReportSource::Days => self.build_from_days().await,
            ReportSource::Snapshot => self.build_from_snapshot().await,
        }
    }

    /// Fetches the day index, then every day file in fixed-size batches.
    async fn build_from_days(&self) -> Result<AlltimeReport> {
        let raw = self
            .host
            .fetch_index()
            .await
            .context("failed to load index.json")?;

        let mut dates = normalize_index(&raw);
        dates.sort();
        dates.dedup();
        info!(days = dates.len(), "Day index loaded");

        let mut rows_by_date: HashMap<String, Vec<ScoreRow>> =
            HashMap::with_capacity(dates.len());

        for chunk in dates.chunks(self.config.batch_size.max(1)) {
            let mut tasks = Vec::with_capacity(chunk.len());
            for date in chunk {
                let host = Arc::clone(&self.host);
                let date = date.clone();
                tasks.push(tokio::spawn(async move {
                    let outcome = match host.fetch_day(&date).await {
                        Ok(payload) => DayOutcome::Rows(normalize(&payload)),
                        Err(e) => {
                            warn!(date = %date, error = %e, "Day fetch failed, treating as zero rows");
                            DayOutcome::Unavailable
                        }
                    };
                    (date, outcome)
                }));
            }

            // Join the whole batch before starting the next one.
            for task in tasks {
                let (date, outcome) = task.await?;
                let rows = match outcome {
                    DayOutcome::Rows(rows) => rows,
                    DayOutcome::Unavailable => Vec::new(),
                };
                rows_by_date.insert(date, rows);
            }
        }

        Ok(aggregate(&dates, &rows_by_date, self.config.max_users))
    }

    /// Loads the precomputed snapshot instead of sweeping day files.
    async fn build_from_snapshot(&self) -> Result<AlltimeReport> {
        let raw = self
            .host
            .fetch_snapshot()
            .await
            .context("failed to load alltime.json")?;

        let report: AlltimeReport =
            serde_json::from_value(raw).context("invalid alltime.json payload")?;
        validate_snapshot(&report)?;

        info!(
            days = report.dates.len(),
            users = report.users.len(),
            "Snapshot loaded"
        );
        Ok(report)
    }
}

/// Every materialized series must line up with the date sequence; a
/// snapshot that does not is rejected rather than zero-filled.
fn validate_snapshot(report: &AlltimeReport) -> Result<()> {
    let days = report.dates.len();
    for user in &report.top_users {
        let aligned = user.daily_totals.len() == days
            && user.daily_scores.len() == days
            && user.cumulative.len() == days
            && user.mean_series.len() == days;
        if !aligned {
            bail!(
                "invalid alltime.json payload: series for {} do not span {} dates",
                user.username,
                days
            );
        }
    }
    Ok(())
}
