pub mod json;
pub mod markdown;
pub mod terminal;

use serde::Serialize;

use crate::store::{FindingRecord, ScanRecord, StoreStats};

pub use json::JsonReporter;
pub use markdown::MarkdownReporter;
pub use terminal::TerminalReporter;

/// A sealed scan together with the findings it touched.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan: ScanRecord,
    pub findings: Vec<FindingRecord>,
}

pub trait Reporter {
    fn scan_report(&self, report: &ScanReport) -> String;
    fn findings(&self, findings: &[FindingRecord]) -> String;
    fn stats(&self, stats: &StoreStats) -> String;
}
