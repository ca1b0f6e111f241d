//! Output formatting and persistence for leaderboard data.
//!
//! Supports JSON log printing, snapshot writing, and CSV append.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::analytics::types::AlltimeReport;
use crate::normalize::ScoreRow;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes the all-time report as a JSON snapshot, creating parent
/// directories as needed. `pretty` trades bytes for readability.
pub fn write_report(path: &str, report: &AlltimeReport, pretty: bool) -> Result<()> {
    let body = if pretty {
        serde_json::to_vec_pretty(report)?
    } else {
        serde_json::to_vec(report)?
    };

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, &body)?;

    info!(path, bytes = body.len(), "Wrote all-time snapshot");
    Ok(())
}

/// One CSV line of the daily append file.
#[derive(Serialize)]
struct DailyRecord<'a> {
    date: &'a str,
    rank: usize,
    username: &'a str,
    user_id: Option<&'a str>,
    score: i64,
}

/// Appends one day's normalized rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_daily_rows(path: &str, date: &str, rows: &[ScoreRow]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = rows.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for row in rows {
        writer.serialize(DailyRecord {
            date,
            rank: row.rank,
            username: &row.username,
            user_id: row.user_id.as_deref(),
            score: row.score,
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_rows() -> Vec<ScoreRow> {
        vec![
            ScoreRow {
                username: "bob".into(),
                user_id: Some("b-1".into()),
                score: 200,
                rank: 1,
            },
            ScoreRow {
                username: "alice".into(),
                user_id: None,
                score: 100,
                rank: 2,
            },
        ]
    }

    fn empty_report() -> AlltimeReport {
        AlltimeReport {
            dates: Vec::new(),
            users: Vec::new(),
            top_users: Vec::new(),
            generated_at: Utc::now(),
            max_users: 10,
        }
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&sample_rows()).unwrap();
    }

    #[test]
    fn test_append_creates_file() {
        let path = temp_path("guessr_leaderboard_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_daily_rows(&path, "2024-01-01", &sample_rows()).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("bob"));
        assert!(content.contains("2024-01-01"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_writes_header_once() {
        let path = temp_path("guessr_leaderboard_test_header.csv");
        let _ = fs::remove_file(&path);

        append_daily_rows(&path, "2024-01-01", &sample_rows()).unwrap();
        append_daily_rows(&path, "2024-01-02", &sample_rows()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("username")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 rows per day.
        assert_eq!(content.lines().count(), 5);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_report_round_trips() {
        let path = temp_path("guessr_leaderboard_test_report/alltime.json");
        let _ = fs::remove_file(&path);

        write_report(&path, &empty_report(), false).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        let back: AlltimeReport = serde_json::from_str(&body).unwrap();
        assert!(back.dates.is_empty());
        assert_eq!(back.max_users, 10);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_report_pretty_is_indented() {
        let path = temp_path("guessr_leaderboard_test_pretty.json");
        let _ = fs::remove_file(&path);

        write_report(&path, &empty_report(), true).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert!(body.contains('\n'));

        fs::remove_file(&path).unwrap();
    }
}
