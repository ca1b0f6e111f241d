//! Pure aggregation of per-day score rows into the all-time report.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::analytics::types::{AlltimeReport, TopUser, UserSummary};
use crate::normalize::ScoreRow;

/// Per-user accumulator, keyed by username while days are folded in.
struct UserAccumulator {
    username: String,
    total: i64,
    per_day: HashMap<String, i64>,
    /// Position of the user's first row across the chronological sweep.
    /// Breaks ties deterministically when totals are equal.
    first_seen: usize,
}

/// Builds the all-time report from per-date normalized rows.
///
/// `dates` must be sorted ascending and deduplicated; dates missing from
/// `rows_by_date` contribute zero rows, which is how failed day fetches
/// flow through. Full time series are materialized only for the top
/// `max_users` users by total.
pub fn aggregate(
    dates: &[String],
    rows_by_date: &HashMap<String, Vec<ScoreRow>>,
    max_users: usize,
) -> AlltimeReport {
    let mut by_user: HashMap<String, UserAccumulator> = HashMap::new();
    let mut seen = 0usize;

    for date in dates {
        let Some(rows) = rows_by_date.get(date) else {
            continue;
        };
        for row in rows {
            let acc = by_user.entry(row.username.clone()).or_insert_with(|| {
                seen += 1;
                UserAccumulator {
                    username: row.username.clone(),
                    total: 0,
                    per_day: HashMap::new(),
                    first_seen: seen,
                }
            });
            acc.total += row.score;
            // Duplicate usernames within one day sum into that date.
            *acc.per_day.entry(date.clone()).or_insert(0) += row.score;
        }
    }

    let mut ordered: Vec<UserAccumulator> = by_user.into_values().collect();
    ordered.sort_by(|a, b| b.total.cmp(&a.total).then(a.first_seen.cmp(&b.first_seen)));

    let mut users = Vec::with_capacity(ordered.len());
    let mut rank = 0;
    let mut prev = None;
    for (idx, acc) in ordered.iter().enumerate() {
        if prev != Some(acc.total) {
            rank = idx + 1;
            prev = Some(acc.total);
        }
        users.push(UserSummary {
            username: acc.username.clone(),
            total: acc.total,
            days: played_days(&acc.per_day),
            rank,
        });
    }

    let top_users = ordered
        .iter()
        .zip(&users)
        .take(max_users)
        .map(|(acc, summary)| hydrate(acc, summary.rank, dates))
        .collect();

    AlltimeReport {
        dates: dates.to_vec(),
        users,
        top_users,
        generated_at: Utc::now(),
        max_users,
    }
}

/// A day counts toward `days` only when its summed score is nonzero; a
/// present zero-score row still counts as participation in the series.
fn played_days(per_day: &HashMap<String, i64>) -> usize {
    per_day.values().filter(|v| **v != 0).count()
}

/// Materializes the full time series for one user in a single pass over
/// the global date sequence.
fn hydrate(acc: &UserAccumulator, rank: usize, dates: &[String]) -> TopUser {
    let mut daily_totals = Vec::with_capacity(dates.len());
    let mut daily_scores = Vec::with_capacity(dates.len());
    let mut cumulative = Vec::with_capacity(dates.len());
    let mut mean_series = Vec::with_capacity(dates.len());

    let mut running = 0i64;
    let mut played = 0usize;
    let mut first_play_index = None;

    for (idx, date) in dates.iter().enumerate() {
        let raw = acc.per_day.get(date).copied();
        let value = raw.unwrap_or(0);

        daily_totals.push(value);
        if raw.is_some() {
            daily_scores.push(Some(value));
            if first_play_index.is_none() {
                first_play_index = Some(idx);
            }
            played += 1;
        } else {
            daily_scores.push(None);
        }

        running += value;
        cumulative.push(running);
        mean_series.push((played > 0).then(|| running as f64 / played as f64));
    }

    TopUser {
        username: acc.username.clone(),
        total: acc.total,
        days: played_days(&acc.per_day),
        rank,
        daily_totals,
        daily_scores,
        cumulative,
        mean_series,
        first_play_index,
        rolling_memo: Mutex::new(HashMap::new()),
    }
}
