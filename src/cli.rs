use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::rules::{FindingStatus, Severity};
use crate::snapshot::{ScanType, Service};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Markdown,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
}

#[derive(Parser, Debug)]
#[command(
    name = "cloud-audit",
    version,
    about = "Security auditor for cloud resource configurations",
    long_about = "cloud-audit evaluates resource-configuration snapshots against a \
                  misconfiguration rule catalog and tracks scored findings across scans."
)]
pub struct Cli {
    /// Path to the findings database (overrides config)
    #[arg(long, value_name = "FILE", global = true)]
    pub db: Option<PathBuf>,

    /// Path to a configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Terminal, global = true)]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a security scan over a snapshot document
    Scan {
        /// Snapshot document (JSON) produced by the resource collector
        #[arg(value_name = "SNAPSHOTS")]
        snapshots: PathBuf,

        /// Which services to scan
        #[arg(short = 't', long = "type", value_enum, default_value_t = ScanType::All)]
        scan_type: ScanType,
    },

    /// Show a scan report (latest when no id is given)
    Report {
        /// Scan id
        scan_id: Option<i64>,
    },

    /// List findings with optional filters
    Findings {
        /// Filter by service
        #[arg(long, value_enum)]
        service: Option<Service>,

        /// Filter by severity
        #[arg(long, value_enum)]
        severity: Option<Severity>,

        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<FindingStatus>,
    },

    /// Show aggregate statistics
    Stats,

    /// Mark a finding as resolved
    Resolve {
        /// Finding id
        finding_id: i64,
    },

    /// Run scans on a fixed schedule
    Schedule {
        /// Snapshot document (JSON), re-read on every trigger
        #[arg(value_name = "SNAPSHOTS")]
        snapshots: PathBuf,

        /// Trigger frequency
        #[arg(value_enum)]
        frequency: Frequency,

        /// Which services to scan
        #[arg(short = 't', long = "type", value_enum, default_value_t = ScanType::All)]
        scan_type: ScanType,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_defaults() {
        let cli = Cli::try_parse_from(["cloud-audit", "scan", "snapshots.json"]).unwrap();
        match cli.command {
            Command::Scan {
                snapshots,
                scan_type,
            } => {
                assert_eq!(snapshots, PathBuf::from("snapshots.json"));
                assert_eq!(scan_type, ScanType::All);
            }
            _ => panic!("expected scan command"),
        }
        assert!(matches!(cli.format, OutputFormat::Terminal));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_scan_single_service() {
        let cli = Cli::try_parse_from([
            "cloud-audit",
            "scan",
            "snapshots.json",
            "--type",
            "storage",
        ])
        .unwrap();
        match cli.command {
            Command::Scan { scan_type, .. } => assert_eq!(scan_type, ScanType::Storage),
            _ => panic!("expected scan command"),
        }
    }

    #[test]
    fn test_parse_format_json() {
        let cli =
            Cli::try_parse_from(["cloud-audit", "--format", "json", "stats"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(matches!(cli.command, Command::Stats));
    }

    #[test]
    fn test_parse_report_with_and_without_id() {
        let cli = Cli::try_parse_from(["cloud-audit", "report"]).unwrap();
        assert!(matches!(cli.command, Command::Report { scan_id: None }));

        let cli = Cli::try_parse_from(["cloud-audit", "report", "7"]).unwrap();
        assert!(matches!(cli.command, Command::Report { scan_id: Some(7) }));
    }

    #[test]
    fn test_parse_findings_filters() {
        let cli = Cli::try_parse_from([
            "cloud-audit",
            "findings",
            "--service",
            "identity",
            "--severity",
            "critical",
            "--status",
            "open",
        ])
        .unwrap();
        match cli.command {
            Command::Findings {
                service,
                severity,
                status,
            } => {
                assert_eq!(service, Some(Service::Identity));
                assert_eq!(severity, Some(Severity::Critical));
                assert_eq!(status, Some(FindingStatus::Open));
            }
            _ => panic!("expected findings command"),
        }
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from(["cloud-audit", "resolve", "12"]).unwrap();
        assert!(matches!(cli.command, Command::Resolve { finding_id: 12 }));
    }

    #[test]
    fn test_parse_schedule() {
        let cli = Cli::try_parse_from([
            "cloud-audit",
            "schedule",
            "snapshots.json",
            "daily",
            "--type",
            "identity",
        ])
        .unwrap();
        match cli.command {
            Command::Schedule {
                frequency,
                scan_type,
                ..
            } => {
                assert!(matches!(frequency, Frequency::Daily));
                assert_eq!(scan_type, ScanType::Identity);
            }
            _ => panic!("expected schedule command"),
        }
    }

    #[test]
    fn test_parse_global_db_override() {
        let cli =
            Cli::try_parse_from(["cloud-audit", "stats", "--db", "/tmp/audit.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/audit.db")));
    }

    #[test]
    fn test_invalid_scan_type_rejected() {
        assert!(
            Cli::try_parse_from(["cloud-audit", "scan", "s.json", "--type", "dns"]).is_err()
        );
    }
}
