//! Operational cleanup commands for Satang.
//!
//! Usage:
//!   maintenance cleanup-stuck-eod [--branch-id UUID] [--eod-id UUID] [--older-than-hours N] [--force]
//!   maintenance cleanup-expired-sessions [--expire-hours N]
//!
//! Exits non-zero on bad arguments or a database failure.

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use satang_db::repositories::{EodRepository, SessionRepository};

const DEFAULT_STUCK_HOURS: i64 = 24;
const DEFAULT_EXPIRE_HOURS: i64 = 0;

struct StuckArgs {
    branch_id: Option<Uuid>,
    eod_id: Option<Uuid>,
    older_than_hours: i64,
    force: bool,
}

fn usage() -> ExitCode {
    eprintln!("usage: maintenance <cleanup-stuck-eod|cleanup-expired-sessions> [options]");
    ExitCode::FAILURE
}

fn parse_stuck_args(args: &[String]) -> Result<StuckArgs, String> {
    let mut parsed = StuckArgs {
        branch_id: None,
        eod_id: None,
        older_than_hours: DEFAULT_STUCK_HOURS,
        force: false,
    };
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--force" => parsed.force = true,
            "--branch-id" | "--eod-id" | "--older-than-hours" => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{flag} requires a value"))?;
                match flag.as_str() {
                    "--branch-id" => {
                        parsed.branch_id =
                            Some(value.parse().map_err(|_| format!("bad uuid {value:?}"))?);
                    }
                    "--eod-id" => {
                        parsed.eod_id =
                            Some(value.parse().map_err(|_| format!("bad uuid {value:?}"))?);
                    }
                    _ => {
                        parsed.older_than_hours =
                            value.parse().map_err(|_| format!("bad hours {value:?}"))?;
                    }
                }
            }
            other => return Err(format!("unknown flag {other:?}")),
        }
    }
    Ok(parsed)
}

fn parse_expire_hours(args: &[String]) -> Result<i64, String> {
    let mut hours = DEFAULT_EXPIRE_HOURS;
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--expire-hours" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--expire-hours requires a value".to_string())?;
                hours = value.parse().map_err(|_| format!("bad hours {value:?}"))?;
            }
            other => return Err(format!("unknown flag {other:?}")),
        }
    }
    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_stuck_args_defaults() {
        let parsed = parse_stuck_args(&[]).unwrap();
        assert_eq!(parsed.older_than_hours, DEFAULT_STUCK_HOURS);
        assert!(!parsed.force);
        assert!(parsed.branch_id.is_none());
    }

    #[test]
    fn test_stuck_args_full() {
        let id = "0198c5b2-0000-7000-8000-000000000001";
        let parsed =
            parse_stuck_args(&args(&["--eod-id", id, "--older-than-hours", "6", "--force"]))
                .unwrap();
        assert_eq!(parsed.eod_id, Some(id.parse().unwrap()));
        assert_eq!(parsed.older_than_hours, 6);
        assert!(parsed.force);
    }

    #[test]
    fn test_stuck_args_rejects_bad_uuid() {
        assert!(parse_stuck_args(&args(&["--branch-id", "nope"])).is_err());
    }

    #[test]
    fn test_expire_hours() {
        assert_eq!(parse_expire_hours(&[]).unwrap(), DEFAULT_EXPIRE_HOURS);
        assert_eq!(
            parse_expire_hours(&args(&["--expire-hours", "48"])).unwrap(),
            48
        );
        assert!(parse_expire_hours(&args(&["--bogus"])).is_err());
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "satang=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        return usage();
    };

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL must be set");
            return ExitCode::FAILURE;
        }
    };
    let db = match satang_db::connect(&database_url).await {
        Ok(db) => db,
        Err(err) => {
            eprintln!("database connection failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    match command.as_str() {
        "cleanup-stuck-eod" => {
            let parsed = match parse_stuck_args(rest) {
                Ok(parsed) => parsed,
                Err(err) => {
                    eprintln!("{err}");
                    return usage();
                }
            };
            match EodRepository::new(db)
                .cleanup_stuck(
                    parsed.branch_id,
                    parsed.eod_id,
                    parsed.older_than_hours,
                    parsed.force,
                )
                .await
            {
                Ok(cancelled) => {
                    println!("cancelled {cancelled} stuck settlement(s)");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("cleanup failed: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        "cleanup-expired-sessions" => {
            let hours = match parse_expire_hours(rest) {
                Ok(hours) => hours,
                Err(err) => {
                    eprintln!("{err}");
                    return usage();
                }
            };
            match SessionRepository::new(db).cleanup_expired(hours).await {
                Ok(removed) => {
                    println!("removed {removed} expired session(s)");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("cleanup failed: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        _ => usage(),
    }
}
