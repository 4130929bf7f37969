use crate::reporter::{Reporter, ScanReport};
use crate::store::{FindingRecord, StoreStats};

pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }

    fn serialize<T: serde::Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize result: {}"}}"#, e))
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for JsonReporter {
    fn scan_report(&self, report: &ScanReport) -> String {
        Self::serialize(report)
    }

    fn findings(&self, findings: &[FindingRecord]) -> String {
        Self::serialize(&findings)
    }

    fn stats(&self, stats: &StoreStats) -> String {
        Self::serialize(stats)
    }
}
