//! Data types for the all-time aggregation pipeline.
//!
//! Serialized names are camelCase to stay byte-compatible with the
//! `alltime.json` snapshot the website consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use super::rolling::RollingPoint;

/// Ranked summary row for one user, listed for every known user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub username: String,
    /// Sum of the user's scores across all days.
    pub total: i64,
    /// Count of dates with a nonzero summed score.
    pub days: usize,
    /// 1-based; equal totals share a rank, the next distinct total takes
    /// its 1-based position.
    pub rank: usize,
}

/// A top-N user with full time series aligned to the report's date
/// sequence.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub username: String,
    pub total: i64,
    pub days: usize,
    pub rank: usize,
    /// Per-date summed score, 0 where the user has no row.
    pub daily_totals: Vec<i64>,
    /// Per-date summed score, `None` where the user did not play.
    pub daily_scores: Vec<Option<i64>>,
    /// Running sum; non-decreasing, ends at `total`.
    pub cumulative: Vec<i64>,
    /// Running mean over days actually played; `None` until the user's
    /// first participation.
    pub mean_series: Vec<Option<f64>>,
    /// Index into `dates` of the first participation, `-1` on the wire
    /// when the user never played.
    #[serde(with = "first_play_index")]
    pub first_play_index: Option<usize>,
    /// Rolling-average memo, keyed by window size. Lives only as long as
    /// the report; a rebuild starts empty.
    #[serde(skip)]
    pub(crate) rolling_memo: Mutex<HashMap<usize, Vec<RollingPoint>>>,
}

/// The complete all-time report, also the on-disk `alltime.json` shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlltimeReport {
    /// Globally sorted ascending, deduplicated.
    pub dates: Vec<String>,
    pub users: Vec<UserSummary>,
    pub top_users: Vec<TopUser>,
    pub generated_at: DateTime<Utc>,
    pub max_users: usize,
}

impl AlltimeReport {
    /// Looks a user up among the materialized top users.
    pub fn top_user(&self, username: &str) -> Option<&TopUser> {
        self.top_users.iter().find(|u| u.username == username)
    }
}

/// The snapshot generator historically wrote `-1` for "never played";
/// accept that, a plain index, or null.
mod first_play_index {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<usize>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(i) => s.serialize_i64(*i as i64),
            None => s.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
        let raw = Option::<i64>::deserialize(d)?;
        Ok(raw.filter(|i| *i >= 0).map(|i| i as usize))
    }
}
