pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod reporter;
pub mod rules;
pub mod scoring;
pub mod snapshot;
pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use cli::{Cli, Command, Frequency, OutputFormat};
pub use config::Config;
pub use engine::{CancelToken, ScanEngine, ScanOutcome};
pub use error::{AuditError, Result};
pub use reporter::{JsonReporter, MarkdownReporter, Reporter, ScanReport, TerminalReporter};
pub use rules::{Check, CheckOutcome, DraftFinding, FindingStatus, Severity};
pub use snapshot::{
    AccountContext, JsonSnapshotProvider, ResourceSnapshot, ScanType, Service, SnapshotDocument,
    SnapshotProvider,
};
pub use store::{
    FindingFilter, FindingRecord, FindingStore, ScanRecord, ScanStatus, ScanSummary,
    ServiceStatus, StoreStats,
};
