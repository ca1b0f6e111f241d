//! Rolling averages over a top user's daily scores.
//!
//! The window is measured in days *played*: non-participated dates are
//! skipped entirely rather than treated as zero, so a window of 7 spans
//! the user's 7 most recent games no matter how sparse their calendar is.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::analytics::types::TopUser;

/// Smallest selectable window, in days played.
pub const ROLLING_MIN: usize = 1;
/// Largest selectable window, in days played.
pub const ROLLING_MAX: usize = 31;

/// One rolling-average sample, anchored to an index into the report's
/// date sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingPoint {
    pub index: usize,
    pub value: f64,
}

/// Clamps a requested window size into the supported range.
pub fn clamp_window(value: i64) -> usize {
    value.clamp(ROLLING_MIN as i64, ROLLING_MAX as i64) as usize
}

impl TopUser {
    /// Trailing simple moving average over participated days.
    ///
    /// Emits one point per participated date from the first participation
    /// onward; the window sum slides incrementally, so the whole series
    /// costs O(n). Results are memoized per window size for the lifetime
    /// of the report and recomputed wholesale when the report is rebuilt.
    pub fn rolling_average(&self, window: usize) -> Vec<RollingPoint> {
        let window = window.max(ROLLING_MIN);

        if let Some(cached) = self
            .rolling_memo
            .lock()
            .expect("rolling memo poisoned")
            .get(&window)
        {
            return cached.clone();
        }

        let mut held: VecDeque<i64> = VecDeque::with_capacity(window);
        let mut sum = 0i64;
        let mut points = Vec::new();

        for (idx, slot) in self.daily_scores.iter().enumerate() {
            let Some(score) = slot else {
                continue;
            };
            held.push_back(*score);
            sum += *score;
            if held.len() > window {
                sum -= held.pop_front().unwrap_or(0);
            }
            if self.first_play_index.is_some_and(|first| idx >= first) {
                points.push(RollingPoint {
                    index: idx,
                    value: sum as f64 / held.len() as f64,
                });
            }
        }

        self.rolling_memo
            .lock()
            .expect("rolling memo poisoned")
            .insert(window, points.clone());
        points
    }
}
