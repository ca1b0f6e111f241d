//! Trait for the static host serving the game's data files.

use anyhow::Result;
use serde_json::Value;

/// Abstraction over the flat-JSON data layout
/// (`index.json`, `{date}/leaderboard.json`, `alltime.json`).
///
/// Payloads come back as raw JSON; shape normalization happens in
/// [`crate::normalize`] so a test double can serve any vintage of the
/// files without knowing about row formats.
#[async_trait::async_trait]
pub trait DataHost: Send + Sync {
    /// Returns the day index: every date a leaderboard exists for.
    async fn fetch_index(&self) -> Result<Value>;

    /// Returns one day's raw leaderboard payload.
    async fn fetch_day(&self, date: &str) -> Result<Value>;

    /// Returns the precomputed all-time snapshot, if the host publishes
    /// one.
    async fn fetch_snapshot(&self) -> Result<Value>;
}
