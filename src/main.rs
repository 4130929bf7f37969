use clap::Parser;
use std::process::ExitCode;

use cloud_audit::handlers::{
    handle_findings, handle_report, handle_resolve, handle_scan, handle_schedule, handle_stats,
};
use cloud_audit::{Cli, Command};

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Scan {
            ref snapshots,
            scan_type,
        } => handle_scan(&cli, snapshots, scan_type),
        Command::Report { scan_id } => handle_report(&cli, scan_id),
        Command::Findings {
            service,
            severity,
            status,
        } => handle_findings(&cli, service, severity, status),
        Command::Stats => handle_stats(&cli),
        Command::Resolve { finding_id } => handle_resolve(&cli, finding_id),
        Command::Schedule {
            ref snapshots,
            frequency,
            scan_type,
        } => handle_schedule(&cli, snapshots, frequency, scan_type),
    }
}
