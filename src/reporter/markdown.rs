//! Markdown reporter, suitable for tickets and docs.

use crate::reporter::{Reporter, ScanReport};
use crate::rules::Severity;
use crate::store::{FindingRecord, ServiceStatus, StoreStats};

pub struct MarkdownReporter;

impl MarkdownReporter {
    pub fn new() -> Self {
        Self
    }

    fn severity_emoji(severity: Severity) -> &'static str {
        match severity {
            Severity::Critical => "\u{1F6A8}",    // 🚨
            Severity::High => "\u{26A0}\u{FE0F}", // ⚠️
            Severity::Medium => "\u{1F7E1}",      // 🟡
            Severity::Low => "\u{1F535}",         // 🔵
        }
    }

    fn findings_table(findings: &[FindingRecord], output: &mut String) {
        output.push_str("| Severity | Check | Resource | Score | Status | Description |\n");
        output.push_str("|----------|-------|----------|-------|--------|-------------|\n");
        for finding in findings {
            output.push_str(&format!(
                "| {} {} | `{}` | `{}` | {}/10 | {} | {} |\n",
                Self::severity_emoji(finding.severity),
                finding.severity,
                finding.check_id,
                finding.resource_id,
                finding.risk_score,
                finding.status,
                finding.description.replace('|', "\\|")
            ));
        }
    }
}

impl Default for MarkdownReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for MarkdownReporter {
    fn scan_report(&self, report: &ScanReport) -> String {
        let scan = &report.scan;
        let mut output = String::new();

        output.push_str(&format!("# Scan Report #{}\n\n", scan.id));
        output.push_str(&format!("- **Type**: {}\n", scan.scan_type));
        output.push_str(&format!("- **Status**: {}\n", scan.status));
        output.push_str(&format!(
            "- **Started**: {}\n",
            scan.start_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if let Some(end) = scan.end_time {
            output.push_str(&format!(
                "- **Completed**: {}\n",
                end.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        if !scan.service_status.is_empty() {
            output.push_str("\n## Services\n\n");
            for (service, status) in &scan.service_status {
                match status {
                    ServiceStatus::Ok {
                        resources,
                        findings,
                    } => output.push_str(&format!(
                        "- `{service}`: ok ({resources} resources, {findings} findings)\n"
                    )),
                    ServiceStatus::Failed { message } => {
                        output.push_str(&format!("- `{service}`: **failed** - {message}\n"));
                    }
                }
            }
        }

        output.push_str("\n## Summary\n\n");
        output.push_str("| Severity | Count |\n|----------|-------|\n");
        for (severity, count) in [
            (Severity::Critical, scan.summary.critical),
            (Severity::High, scan.summary.high),
            (Severity::Medium, scan.summary.medium),
            (Severity::Low, scan.summary.low),
        ] {
            output.push_str(&format!(
                "| {} {} | {} |\n",
                Self::severity_emoji(severity),
                severity,
                count
            ));
        }

        if report.findings.is_empty() {
            output.push_str("\nNo security issues found.\n");
        } else {
            output.push_str("\n## Findings\n\n");
            Self::findings_table(&report.findings, &mut output);
        }

        output
    }

    fn findings(&self, findings: &[FindingRecord]) -> String {
        let mut output = String::new();
        output.push_str(&format!("# Findings ({})\n\n", findings.len()));
        if findings.is_empty() {
            output.push_str("No findings match the given filters.\n");
        } else {
            Self::findings_table(findings, &mut output);
        }
        output
    }

    fn stats(&self, stats: &StoreStats) -> String {
        let mut output = String::new();
        output.push_str("# Security Statistics\n\n");
        output.push_str(&format!("- **Total scans**: {}\n", stats.total_scans));
        output.push_str(&format!("- **Open findings**: {}\n", stats.open_count));
        output.push_str(&format!("- **Resolved findings**: {}\n", stats.resolved_count));

        if !stats.totals_by_severity.is_empty() {
            output.push_str("\n## Open findings by severity\n\n");
            output.push_str("| Severity | Count |\n|----------|-------|\n");
            for (severity, count) in stats.totals_by_severity.iter().rev() {
                output.push_str(&format!(
                    "| {} {} | {} |\n",
                    Self::severity_emoji(*severity),
                    severity,
                    count
                ));
            }
        }

        if !stats.totals_by_service.is_empty() {
            output.push_str("\n## Open findings by service\n\n");
            output.push_str("| Service | Count |\n|---------|-------|\n");
            for (service, count) in &stats.totals_by_service {
                output.push_str(&format!("| `{service}` | {count} |\n"));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ScanType, Service};
    use crate::store::{FindingFilter, FindingStore, ScanStatus};
    use crate::test_utils::fixtures::{capture_time, draft};
    use std::collections::BTreeMap;

    fn sample_report() -> ScanReport {
        let store = FindingStore::open_in_memory().unwrap();
        let scan_id = store.begin_scan(ScanType::All, capture_time()).unwrap();
        store
            .record(
                scan_id,
                &[
                    draft("public_bucket_policy", Service::Storage, "b1", 10),
                    draft("instance_missing_tags", Service::Compute, "i-1", 3),
                ],
                capture_time(),
            )
            .unwrap();
        let scan = store
            .seal(scan_id, ScanStatus::Completed, &BTreeMap::new(), capture_time())
            .unwrap();
        let findings = store
            .query(&FindingFilter {
                scan_id: Some(scan_id),
                ..Default::default()
            })
            .unwrap();
        ScanReport { scan, findings }
    }

    #[test]
    fn test_markdown_scan_report() {
        let report = sample_report();
        let output = MarkdownReporter::new().scan_report(&report);

        assert!(output.starts_with("# Scan Report #"));
        assert!(output.contains("| Severity | Count |"));
        assert!(output.contains("`public_bucket_policy`"));
        assert!(output.contains("`b1`"));
        assert!(output.contains("10/10"));
    }

    #[test]
    fn test_markdown_escapes_pipes_in_descriptions() {
        let mut report = sample_report();
        report.findings[0].description = "left | right".to_string();
        let output = MarkdownReporter::new().scan_report(&report);
        assert!(output.contains("left \\| right"));
    }

    #[test]
    fn test_markdown_findings_list() {
        let report = sample_report();
        let output = MarkdownReporter::new().findings(&report.findings);
        assert!(output.starts_with("# Findings (2)"));
        assert!(output.contains("`instance_missing_tags`"));
    }

    #[test]
    fn test_markdown_stats() {
        let store = FindingStore::open_in_memory().unwrap();
        let output = MarkdownReporter::new().stats(&store.stats().unwrap());
        assert!(output.contains("# Security Statistics"));
        assert!(output.contains("- **Open findings**: 0"));
    }
}
