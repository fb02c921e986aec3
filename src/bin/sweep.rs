//! dayscore-sweep — scheduled reconciliation sweep.
//!
//! Detects drift over the recent window, then batch-repairs every affected
//! user with bounded concurrency. Safe to run from cron: detection is
//! read-only and repair is idempotent.
//!
//! Usage: dayscore-sweep <db-path> [--window DAYS] [--concurrency N] [--dry-run]

use std::path::PathBuf;
use std::process::ExitCode;

use dayscore::{repair_batch, Engine, EngineConfig, EngineError, ScoreDb};

struct Args {
    db_path: PathBuf,
    window_days: Option<i64>,
    concurrency: Option<usize>,
    dry_run: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut db_path = None;
    let mut window_days = None;
    let mut concurrency = None;
    let mut dry_run = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--window" => {
                let value = args.next().ok_or("--window requires a value")?;
                window_days = Some(value.parse::<i64>().map_err(|e| format!("--window: {e}"))?);
            }
            "--concurrency" => {
                let value = args.next().ok_or("--concurrency requires a value")?;
                concurrency =
                    Some(value.parse::<usize>().map_err(|e| format!("--concurrency: {e}"))?);
            }
            "--dry-run" => dry_run = true,
            other if other.starts_with("--") => return Err(format!("unknown flag {other}")),
            other => {
                if db_path.is_some() {
                    return Err("more than one db path given".to_string());
                }
                db_path = Some(PathBuf::from(other));
            }
        }
    }

    Ok(Args {
        db_path: db_path.ok_or("usage: dayscore-sweep <db-path> [--window DAYS] [--concurrency N] [--dry-run]")?,
        window_days,
        concurrency,
        dry_run,
    })
}

/// Returns false when some users failed repair (partial result, non-zero exit).
async fn run(args: Args) -> Result<bool, EngineError> {
    let mut config = EngineConfig::default();
    if let Some(window) = args.window_days {
        config.detection_window_days = window;
    }
    if let Some(concurrency) = args.concurrency {
        config.batch_concurrency = concurrency;
    }

    let db = ScoreDb::open_at(args.db_path.clone())?;
    let engine = Engine::new(db, config.clone());

    let report = engine.detect_issues()?;
    let users = report.users_needing_repair();
    log::info!(
        "sweep: {} missing, {} duplicate, {} implausible across {} users; {} need repair",
        report.missing.len(),
        report.duplicates.len(),
        report.implausible.len(),
        report.scanned_users,
        users.len()
    );

    if args.dry_run || users.is_empty() {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .unwrap_or_else(|_| "<report encoding failed>".to_string())
        );
        return Ok(true);
    }

    let db_path = args.db_path;
    let summary = repair_batch(
        move || ScoreDb::open_at(db_path.clone()).map_err(EngineError::from),
        config,
        users,
        None,
    )
    .await;

    println!(
        "{}",
        serde_json::to_string_pretty(&summary)
            .unwrap_or_else(|_| "<summary encoding failed>".to_string())
    );

    Ok(summary.failed.is_empty())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("sweep failed: {e}");
            eprintln!("sweep failed: {e}");
            ExitCode::FAILURE
        }
    }
}
