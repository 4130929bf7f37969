use colored::Colorize;

use crate::reporter::{Reporter, ScanReport};
use crate::rules::Severity;
use crate::store::{FindingRecord, ScanStatus, ServiceStatus, StoreStats};

/// How many findings to show per severity group before folding.
const GROUP_PREVIEW: usize = 5;

pub struct TerminalReporter {
    verbose: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn severity_label(&self, severity: Severity) -> colored::ColoredString {
        let label = format!("[{severity}]");
        match severity {
            Severity::Critical => label.red().bold(),
            Severity::High => label.yellow().bold(),
            Severity::Medium => label.cyan(),
            Severity::Low => label.white(),
        }
    }

    fn status_label(&self, status: ScanStatus) -> colored::ColoredString {
        match status {
            ScanStatus::Completed => status.as_str().green(),
            ScanStatus::Running => status.as_str().cyan(),
            ScanStatus::Failed => status.as_str().red().bold(),
        }
    }

    fn format_finding(&self, finding: &FindingRecord, output: &mut String) {
        output.push_str(&format!(
            "  {} {} [{}]\n",
            self.severity_label(finding.severity),
            finding.title.bold(),
            finding.resource_id.dimmed()
        ));
        output.push_str(&format!("     {}\n", finding.description));
        output.push_str(&format!(
            "     Risk Score: {}/10 | Status: {} | First seen: scan {}\n",
            finding.risk_score, finding.status, finding.first_seen_scan_id
        ));
        if self.verbose && !finding.recommendation.is_empty() {
            output.push_str(&format!("     Recommendation: {}\n", finding.recommendation));
        }
    }

    fn format_severity_groups(&self, findings: &[FindingRecord], output: &mut String) {
        for severity in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ] {
            let group: Vec<&FindingRecord> = findings
                .iter()
                .filter(|finding| finding.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }

            output.push_str(&format!(
                "\n{} {} issues\n",
                self.severity_label(severity),
                group.len()
            ));

            let shown = if self.verbose {
                group.len()
            } else {
                group.len().min(GROUP_PREVIEW)
            };
            for finding in &group[..shown] {
                self.format_finding(finding, output);
            }
            if group.len() > shown {
                output.push_str(&format!("  ... and {} more\n", group.len() - shown));
            }
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Reporter for TerminalReporter {
    fn scan_report(&self, report: &ScanReport) -> String {
        let mut output = String::new();
        let scan = &report.scan;

        output.push_str(&format!(
            "{}\n",
            format!("━━━ SCAN REPORT (ID: {}) ━━━", scan.id).bold()
        ));
        output.push_str(&format!("Type:      {}\n", scan.scan_type));
        output.push_str(&format!(
            "Started:   {}\n",
            scan.start_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if let Some(end) = scan.end_time {
            output.push_str(&format!(
                "Completed: {}\n",
                end.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        output.push_str(&format!("Status:    {}\n", self.status_label(scan.status)));

        if !scan.service_status.is_empty() {
            output.push_str("Services:\n");
            for (service, status) in &scan.service_status {
                match status {
                    ServiceStatus::Ok {
                        resources,
                        findings,
                    } => {
                        output.push_str(&format!(
                            "  {} {service}: {resources} resources, {findings} findings\n",
                            "✓".green()
                        ));
                    }
                    ServiceStatus::Failed { message } => {
                        output.push_str(&format!(
                            "  {} {service}: {message}\n",
                            "✗".red().bold()
                        ));
                    }
                }
            }
        }

        let summary = &scan.summary;
        if summary.total() == 0 {
            output.push_str(&format!("\n{}\n", "No security issues found!".green()));
        } else {
            output.push_str(&format!(
                "\nFindings: {} ({} critical, {} high, {} medium, {} low)\n",
                summary.total(),
                summary.critical,
                summary.high,
                summary.medium,
                summary.low
            ));
            self.format_severity_groups(&report.findings, &mut output);
        }

        output
    }

    fn findings(&self, findings: &[FindingRecord]) -> String {
        let mut output = String::new();
        if findings.is_empty() {
            output.push_str("No findings match the given filters.\n");
            return output;
        }

        output.push_str(&format!("{} findings\n", findings.len()));
        for finding in findings {
            output.push_str(&format!(
                "{} #{} {} [{}/{}]\n",
                self.severity_label(finding.severity),
                finding.id,
                finding.title.bold(),
                finding.service,
                finding.resource_id
            ));
            output.push_str(&format!(
                "     {} | score {}/10 | {}\n",
                finding.status, finding.risk_score, finding.description
            ));
        }
        output
    }

    fn stats(&self, stats: &StoreStats) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", "━━━ SECURITY STATISTICS ━━━".bold()));
        output.push_str(&format!("Total Scans:      {}\n", stats.total_scans));
        output.push_str(&format!("Open Findings:    {}\n", stats.open_count));
        output.push_str(&format!("Resolved:         {}\n", stats.resolved_count));

        if !stats.totals_by_severity.is_empty() {
            output.push_str("\nBy severity (open):\n");
            for (severity, count) in stats.totals_by_severity.iter().rev() {
                output.push_str(&format!(
                    "  {} {}\n",
                    self.severity_label(*severity),
                    count
                ));
            }
        }

        if !stats.totals_by_service.is_empty() {
            output.push_str("\nBy service (open):\n");
            for (service, count) in &stats.totals_by_service {
                output.push_str(&format!("  {service}: {count}\n"));
            }
        }

        if let Some(latest) = &stats.latest_scan {
            output.push_str(&format!(
                "\nLatest scan: {} findings ({} critical, {} high)\n",
                latest.total(),
                latest.critical,
                latest.high
            ));
        }

        output
    }
}
