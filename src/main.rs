//! CLI entry point for the Guessr leaderboard tool.
//!
//! Provides subcommands for viewing a single day's leaderboard, building
//! the all-time aggregate snapshot, listing the day index, and computing
//! rolling averages for a top user.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use guessr_leaderboard::{
    analytics::loader::{
        AlltimeService, DEFAULT_BATCH_SIZE, DEFAULT_MAX_USERS, LoadConfig, ReportSource,
    },
    analytics::rolling::clamp_window,
    infra::statichost::StaticDataClient,
    normalize::{normalize, normalize_index},
    output::{append_daily_rows, write_report},
    services::DataHost,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// The game day rolls over at 09:00; before the cutover the previous
/// date is still current.
const GAME_DAY_CUTOVER_HOURS: i64 = 9;

#[derive(Parser)]
#[command(name = "guessr_leaderboard")]
#[command(about = "Fetch and aggregate daily geography-game leaderboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one day's ranked leaderboard
    Daily {
        /// Date to load (YYYY-MM-DD); defaults to the current game day
        #[arg(value_name = "DATE")]
        date: Option<String>,

        /// Data host base URL (falls back to LEADERBOARD_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// CSV file to append the rows to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Build the all-time report and write it as a JSON snapshot
    Alltime {
        /// Data host base URL (falls back to LEADERBOARD_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// How many top users get full time series
        #[arg(long, default_value_t = DEFAULT_MAX_USERS)]
        max_users: usize,

        /// How many day files to fetch simultaneously
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        concurrency: usize,

        /// Output file for the snapshot
        #[arg(short, long, default_value = "alltime.json")]
        output: String,

        /// Pretty-print the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Load the host's precomputed alltime.json instead of sweeping
        /// day files
        #[arg(long, default_value_t = false)]
        from_snapshot: bool,
    },
    /// List the day index
    Index {
        /// Data host base URL (falls back to LEADERBOARD_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Print rolling averages for one of the top users
    Rolling {
        /// Username, as it appears on the leaderboard
        #[arg(value_name = "USERNAME")]
        username: String,

        /// Window size in days played (clamped to 1-31)
        #[arg(short, long, default_value_t = 7)]
        window: i64,

        /// Data host base URL (falls back to LEADERBOARD_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Load the host's precomputed alltime.json instead of sweeping
        /// day files
        #[arg(long, default_value_t = false)]
        from_snapshot: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/guessr_leaderboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("guessr_leaderboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daily {
            date,
            base_url,
            output,
        } => {
            let base = resolve_base_url(base_url)?;
            let date = match date {
                Some(d) => validated_date(&d)?,
                None => game_day_today(),
            };

            let client = StaticDataClient::new(base);
            let payload = client
                .fetch_day(&date)
                .await
                .with_context(|| format!("failed to load leaderboard for {date}"))?;
            let rows = normalize(&payload);

            for row in &rows {
                info!(
                    rank = row.rank,
                    username = %row.username,
                    score = row.score,
                    "Entry"
                );
            }
            info!(date = %date, entries = rows.len(), "Daily leaderboard loaded");

            if let Some(path) = output {
                append_daily_rows(&path, &date, &rows)?;
                info!(path = %path, "Rows appended");
            }
        }
        Commands::Alltime {
            base_url,
            max_users,
            concurrency,
            output,
            pretty,
            from_snapshot,
        } => {
            let base = resolve_base_url(base_url)?;
            let config = LoadConfig {
                max_users: max_users.max(1),
                batch_size: concurrency,
                source: if from_snapshot {
                    ReportSource::Snapshot
                } else {
                    ReportSource::Days
                },
            };

            let service = AlltimeService::new(StaticDataClient::new(base), config);
            let report = service.load().await?;

            write_report(&output, &report, pretty)?;
            info!(
                days = report.dates.len(),
                users = report.users.len(),
                "Aggregation complete"
            );
        }
        Commands::Index { base_url } => {
            let base = resolve_base_url(base_url)?;
            let client = StaticDataClient::new(base);

            let raw = client
                .fetch_index()
                .await
                .context("failed to load index.json")?;
            let mut dates = normalize_index(&raw);
            dates.sort();
            dates.dedup();

            for date in &dates {
                info!(date = %date, "Day");
            }
            info!(
                total = dates.len(),
                first = dates.first().map(String::as_str),
                last = dates.last().map(String::as_str),
                "Day index summary"
            );
        }
        Commands::Rolling {
            username,
            window,
            base_url,
            from_snapshot,
        } => {
            let base = resolve_base_url(base_url)?;
            let config = LoadConfig {
                source: if from_snapshot {
                    ReportSource::Snapshot
                } else {
                    ReportSource::Days
                },
                ..LoadConfig::default()
            };

            let service = AlltimeService::new(StaticDataClient::new(base), config);
            let report = service.load().await?;

            let Some(user) = report.top_user(&username) else {
                bail!(
                    "{username} is not among the top {} users",
                    report.top_users.len()
                );
            };

            let window = clamp_window(window);
            let points = user.rolling_average(window);
            for point in &points {
                info!(
                    date = %report.dates[point.index],
                    index = point.index,
                    value = point.value,
                    "Rolling average"
                );
            }
            info!(
                username = %username,
                window,
                points = points.len(),
                "Rolling series computed"
            );
        }
    }

    Ok(())
}

/// Resolves the data host base URL from the flag or the environment.
fn resolve_base_url(flag: Option<String>) -> Result<String> {
    let url = match flag {
        Some(url) => url,
        None => std::env::var("LEADERBOARD_BASE_URL")
            .context("no --base-url given and LEADERBOARD_BASE_URL is not set")?,
    };
    Ok(url.trim_end_matches('/').to_string())
}

fn validated_date(date: &str) -> Result<String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("invalid date {date:?}, expected YYYY-MM-DD"))?;
    Ok(date.to_string())
}

/// The current game day: today's date, shifted back across the cutover.
fn game_day_today() -> String {
    (Utc::now() - chrono::Duration::hours(GAME_DAY_CUTOVER_HOURS))
        .format("%Y-%m-%d")
        .to_string()
}
