//! CLI command handlers. Thin adapters over the core: they load config,
//! open the store, call the engine or the store's read API, and format the
//! result via a reporter.

use std::path::Path;
use std::process::ExitCode;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Frequency, OutputFormat};
use crate::config::Config;
use crate::engine::ScanEngine;
use crate::error::{AuditError, Result};
use crate::reporter::{JsonReporter, MarkdownReporter, Reporter, ScanReport, TerminalReporter};
use crate::rules::{FindingStatus, Severity};
use crate::snapshot::{AccountContext, JsonSnapshotProvider, ScanType, Service, SnapshotProvider};
use crate::store::{FindingFilter, FindingStore, ScanStatus};

fn reporter_for(cli: &Cli) -> Box<dyn Reporter> {
    match cli.format {
        OutputFormat::Terminal => Box::new(TerminalReporter::new(cli.verbose)),
        OutputFormat::Json => Box::new(JsonReporter::new()),
        OutputFormat::Markdown => Box::new(MarkdownReporter::new()),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::from_file(path),
        None => Ok(Config::load(Some(Path::new(".")))),
    }
}

fn open_store(cli: &Cli, config: &Config) -> Result<FindingStore> {
    let path = cli.db.clone().unwrap_or_else(|| config.database_path.clone());
    debug!(path = %path.display(), "opening finding store");
    FindingStore::open(&path)
}

fn build_report(store: &FindingStore, scan_id: i64) -> Result<ScanReport> {
    let scan = store.get_scan(scan_id)?;
    let findings = store.query(&FindingFilter {
        scan_id: Some(scan_id),
        ..Default::default()
    })?;
    Ok(ScanReport { scan, findings })
}

fn run_one_scan(
    config: &Config,
    store: &FindingStore,
    snapshots: &Path,
    scan_type: ScanType,
) -> Result<ScanReport> {
    let provider = JsonSnapshotProvider::open(snapshots)?;
    let ctx = AccountContext::new(
        provider.captured_at().unwrap_or_else(Utc::now),
        config,
    );
    let engine = ScanEngine::new(&provider, store, ctx);
    let outcome = engine.run(scan_type)?;
    build_report(store, outcome.scan_id)
}

/// Handle `scan`.
pub fn handle_scan(cli: &Cli, snapshots: &Path, scan_type: ScanType) -> ExitCode {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    let store = match open_store(cli, &config) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    match run_one_scan(&config, &store, snapshots, scan_type) {
        Ok(report) => {
            println!("{}", reporter_for(cli).scan_report(&report));
            if report.scan.status == ScanStatus::Failed {
                ExitCode::from(2)
            } else if report.scan.summary.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

/// Handle `report`.
pub fn handle_report(cli: &Cli, scan_id: Option<i64>) -> ExitCode {
    let result = load_config(cli)
        .and_then(|config| open_store(cli, &config))
        .and_then(|store| {
            let scan_id = match scan_id {
                Some(id) => id,
                None => store.latest_scan()?.ok_or(AuditError::NoScans)?.id,
            };
            build_report(&store, scan_id)
        });

    match result {
        Ok(report) => {
            println!("{}", reporter_for(cli).scan_report(&report));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

/// Handle `findings`.
pub fn handle_findings(
    cli: &Cli,
    service: Option<Service>,
    severity: Option<Severity>,
    status: Option<FindingStatus>,
) -> ExitCode {
    let result = load_config(cli)
        .and_then(|config| open_store(cli, &config))
        .and_then(|store| {
            store.query(&FindingFilter {
                service,
                severity,
                status,
                scan_id: None,
            })
        });

    match result {
        Ok(findings) => {
            println!("{}", reporter_for(cli).findings(&findings));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

/// Handle `stats`.
pub fn handle_stats(cli: &Cli) -> ExitCode {
    let result = load_config(cli)
        .and_then(|config| open_store(cli, &config))
        .and_then(|store| store.stats());

    match result {
        Ok(stats) => {
            println!("{}", reporter_for(cli).stats(&stats));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

/// Handle `resolve`.
pub fn handle_resolve(cli: &Cli, finding_id: i64) -> ExitCode {
    let result = load_config(cli)
        .and_then(|config| open_store(cli, &config))
        .and_then(|store| store.resolve(finding_id, Utc::now()));

    match result {
        Ok(()) => {
            println!("Finding {finding_id} marked as resolved");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

pub(crate) fn frequency_interval(frequency: Frequency) -> chrono::Duration {
    match frequency {
        Frequency::Hourly => chrono::Duration::hours(1),
        Frequency::Daily => chrono::Duration::days(1),
        Frequency::Weekly => chrono::Duration::weeks(1),
    }
}

/// Handle `schedule`: run a scan per trigger, forever. The loop is
/// sequential, so a trigger firing while a scan still runs is skipped (with
/// a warning) rather than queued; scans of the same type never overlap.
pub fn handle_schedule(
    cli: &Cli,
    snapshots: &Path,
    frequency: Frequency,
    scan_type: ScanType,
) -> ExitCode {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    let store = match open_store(cli, &config) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let interval = frequency_interval(frequency);
    info!(
        scan_type = scan_type.as_str(),
        interval_secs = interval.num_seconds(),
        "scheduler started"
    );
    println!(
        "Scheduler started: {scan_type} scan every {} minutes. Press Ctrl+C to stop.",
        interval.num_minutes()
    );

    loop {
        let started = Utc::now();
        // The document is re-read each trigger so a refreshed export is
        // picked up without restarting the scheduler. Failures are logged
        // and retried on the next trigger, never fatal.
        match run_one_scan(&config, &store, snapshots, scan_type) {
            Ok(report) => {
                info!(
                    scan_id = report.scan.id,
                    status = report.scan.status.as_str(),
                    findings = report.scan.summary.total(),
                    "scheduled scan finished"
                );
                println!("{}", reporter_for(cli).scan_report(&report));
            }
            Err(err) => {
                warn!(error = %err, "scheduled scan failed; retrying on next trigger");
            }
        }

        let elapsed = Utc::now() - started;
        if elapsed >= interval {
            warn!("scan outlasted the schedule interval; skipping missed triggers");
        }
        let wait = (interval - elapsed).to_std().unwrap_or_default();
        std::thread::sleep(wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_intervals() {
        assert_eq!(
            frequency_interval(Frequency::Hourly),
            chrono::Duration::hours(1)
        );
        assert_eq!(
            frequency_interval(Frequency::Daily),
            chrono::Duration::days(1)
        );
        assert_eq!(
            frequency_interval(Frequency::Weekly),
            chrono::Duration::weeks(1)
        );
    }
}
