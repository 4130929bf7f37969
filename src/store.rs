//! Finding store: SQLite persistence for scans and findings.
//!
//! The store owns the finding lifecycle. Recording a draft either refreshes
//! the matching open finding (`last_seen_scan_id`) or creates a new one;
//! reconciliation resolves open findings whose trigger no longer holds in a
//! scan that covered their resource. At most one open finding exists per
//! `(check_id, resource_id)` pair, backed by a partial unique index.
//!
//! All access goes through a store-level lock: writes are short and
//! contention is low, so one lock per store is sufficient to serialize
//! concurrent service scans.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{AuditError, Result};
use crate::rules::{DraftFinding, FindingStatus, Severity};
use crate::snapshot::{ScanType, Service};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_type TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    status TEXT NOT NULL,
    critical_count INTEGER NOT NULL DEFAULT 0,
    high_count INTEGER NOT NULL DEFAULT 0,
    medium_count INTEGER NOT NULL DEFAULT 0,
    low_count INTEGER NOT NULL DEFAULT 0,
    service_status TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS findings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    check_id TEXT NOT NULL,
    service TEXT NOT NULL,
    resource_id TEXT NOT NULL,
    resource_name TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    recommendation TEXT NOT NULL,
    severity TEXT NOT NULL,
    risk_score INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    first_seen_scan_id INTEGER NOT NULL,
    last_seen_scan_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    resolved_at TEXT,
    FOREIGN KEY (first_seen_scan_id) REFERENCES scans (id)
);

CREATE INDEX IF NOT EXISTS idx_findings_service ON findings (service);
CREATE INDEX IF NOT EXISTS idx_findings_severity ON findings (severity);
CREATE INDEX IF NOT EXISTS idx_findings_status ON findings (status);
CREATE INDEX IF NOT EXISTS idx_findings_last_seen ON findings (last_seen_scan_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_findings_open_identity
    ON findings (check_id, resource_id) WHERE status = 'open';
";

const SCAN_COLUMNS: &str = "id, scan_type, start_time, end_time, status, \
    critical_count, high_count, medium_count, low_count, service_status";

const FINDING_COLUMNS: &str = "id, check_id, service, resource_id, resource_name, \
    title, description, recommendation, severity, risk_score, status, \
    first_seen_scan_id, last_seen_scan_id, created_at, resolved_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(ScanStatus::Running),
            "completed" => Some(ScanStatus::Completed),
            "failed" => Some(ScanStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Findings-by-severity counts, frozen into the scan row at sealing time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ScanSummary {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    pub fn passed(&self) -> bool {
        self.critical == 0 && self.high == 0
    }
}

/// Per-service outcome recorded on the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok { resources: usize, findings: usize },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub scan_type: ScanType,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: ScanStatus,
    pub summary: ScanSummary,
    pub service_status: BTreeMap<Service, ServiceStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingRecord {
    pub id: i64,
    pub check_id: String,
    pub service: Service,
    pub resource_id: String,
    pub resource_name: String,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub severity: Severity,
    pub risk_score: u8,
    pub status: FindingStatus,
    pub first_seen_scan_id: i64,
    pub last_seen_scan_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub service: Option<Service>,
    pub severity: Option<Severity>,
    pub status: Option<FindingStatus>,
    /// Restrict to findings touched by this scan.
    pub scan_id: Option<i64>,
}

/// Result of recording one scan's drafts for a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub created: usize,
    pub refreshed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_scans: usize,
    pub open_count: usize,
    pub resolved_count: usize,
    /// Open findings by severity.
    pub totals_by_severity: BTreeMap<Severity, usize>,
    /// Open findings by service.
    pub totals_by_service: BTreeMap<Service, usize>,
    /// Frozen summary of the most recent scan, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_scan: Option<ScanSummary>,
}

pub struct FindingStore {
    conn: Mutex<Connection>,
}

impl FindingStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new scan record with status `running`.
    pub fn begin_scan(&self, scan_type: ScanType, now: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO scans (scan_type, start_time, status) VALUES (?1, ?2, ?3)",
            params![
                scan_type.as_str(),
                now.to_rfc3339(),
                ScanStatus::Running.as_str()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record a scan's draft findings. A draft matching an open finding by
    /// `(check_id, resource_id)` refreshes its `last_seen_scan_id`; anything
    /// else becomes a new open finding.
    pub fn record(
        &self,
        scan_id: i64,
        drafts: &[DraftFinding],
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut outcome = RecordOutcome::default();

        for draft in drafts {
            let refreshed = tx.execute(
                "UPDATE findings SET last_seen_scan_id = ?1 \
                 WHERE check_id = ?2 AND resource_id = ?3 AND status = 'open'",
                params![scan_id, draft.check_id, draft.resource_id],
            )?;

            if refreshed == 0 {
                tx.execute(
                    "INSERT INTO findings (check_id, service, resource_id, resource_name, \
                     title, description, recommendation, severity, risk_score, status, \
                     first_seen_scan_id, last_seen_scan_id, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        draft.check_id,
                        draft.service.as_str(),
                        draft.resource_id,
                        draft.resource_name,
                        draft.title,
                        draft.description,
                        draft.recommendation,
                        draft.severity().as_str(),
                        draft.risk_score,
                        FindingStatus::Open.as_str(),
                        scan_id,
                        scan_id,
                        now.to_rfc3339(),
                    ],
                )?;
                outcome.created += 1;
            } else {
                outcome.refreshed += 1;
            }
        }

        tx.commit()?;
        trace!(
            scan_id,
            created = outcome.created,
            refreshed = outcome.refreshed,
            "recorded drafts"
        );
        Ok(outcome)
    }

    /// Resolve open findings for `service` whose resource was covered by
    /// this scan but did not recur. Resources outside `covered` are left
    /// untouched: absence of data is not absence of the problem.
    pub fn reconcile(
        &self,
        scan_id: i64,
        service: Service,
        covered: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let stale: Vec<(i64, String)> = {
            let mut stmt = tx.prepare(
                "SELECT id, resource_id FROM findings \
                 WHERE service = ?1 AND status = 'open' AND last_seen_scan_id < ?2",
            )?;
            let rows = stmt.query_map(params![service.as_str(), scan_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            out
        };

        let mut resolved = 0;
        for (finding_id, resource_id) in stale {
            if !covered.contains(&resource_id) {
                continue;
            }
            tx.execute(
                "UPDATE findings SET status = 'resolved', resolved_at = ?1 WHERE id = ?2",
                params![now.to_rfc3339(), finding_id],
            )?;
            resolved += 1;
        }

        tx.commit()?;
        trace!(scan_id, service = service.as_str(), resolved, "reconciled");
        Ok(resolved)
    }

    /// Seal a scan: freeze the severity summary over the findings this scan
    /// touched and write the final status and per-service notes.
    pub fn seal(
        &self,
        scan_id: i64,
        status: ScanStatus,
        service_status: &BTreeMap<Service, ServiceStatus>,
        now: DateTime<Utc>,
    ) -> Result<ScanRecord> {
        let conn = self.conn();
        let summary = summary_for(&conn, scan_id)?;
        let notes = serde_json::to_string(service_status)?;

        let changed = conn.execute(
            "UPDATE scans SET end_time = ?1, status = ?2, critical_count = ?3, \
             high_count = ?4, medium_count = ?5, low_count = ?6, service_status = ?7 \
             WHERE id = ?8",
            params![
                now.to_rfc3339(),
                status.as_str(),
                summary.critical,
                summary.high,
                summary.medium,
                summary.low,
                notes,
                scan_id
            ],
        )?;
        if changed == 0 {
            return Err(AuditError::ScanNotFound(scan_id));
        }

        scan_by_id(&conn, scan_id)
    }

    pub fn get_scan(&self, scan_id: i64) -> Result<ScanRecord> {
        scan_by_id(&self.conn(), scan_id)
    }

    pub fn latest_scan(&self) -> Result<Option<ScanRecord>> {
        let conn = self.conn();
        let record = conn
            .query_row(
                &format!("SELECT {SCAN_COLUMNS} FROM scans ORDER BY id DESC LIMIT 1"),
                [],
                scan_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_scans(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {SCAN_COLUMNS} FROM scans ORDER BY id DESC LIMIT ?1"))?;
        let rows = stmt.query_map(params![limit], scan_from_row)?;
        let mut scans = Vec::new();
        for row in rows {
            scans.push(row?);
        }
        Ok(scans)
    }

    pub fn get_finding(&self, finding_id: i64) -> Result<FindingRecord> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FINDING_COLUMNS} FROM findings WHERE id = ?1"),
            params![finding_id],
            finding_from_row,
        )
        .optional()?
        .ok_or(AuditError::FindingNotFound(finding_id))
    }

    /// Filtered findings, most recently seen first.
    pub fn query(&self, filter: &FindingFilter) -> Result<Vec<FindingRecord>> {
        let mut sql = format!("SELECT {FINDING_COLUMNS} FROM findings");
        let mut clauses: Vec<&str> = Vec::new();
        let mut bound: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(service) = filter.service {
            clauses.push("service = ?");
            bound.push(Box::new(service.as_str()));
        }
        if let Some(severity) = filter.severity {
            clauses.push("severity = ?");
            bound.push(Box::new(severity.as_str()));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            bound.push(Box::new(status.as_str()));
        }
        if let Some(scan_id) = filter.scan_id {
            clauses.push("last_seen_scan_id = ?");
            bound.push(Box::new(scan_id));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY last_seen_scan_id DESC, risk_score DESC, id DESC");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = bound.iter().map(Box::as_ref).collect();
        let rows = stmt.query_map(refs.as_slice(), finding_from_row)?;
        let mut findings = Vec::new();
        for row in rows {
            findings.push(row?);
        }
        Ok(findings)
    }

    /// Manual resolution, independent of automatic reconciliation.
    /// Idempotent on already-resolved findings.
    pub fn resolve(&self, finding_id: i64, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE findings SET status = 'resolved', resolved_at = ?1 \
             WHERE id = ?2 AND status = 'open'",
            params![now.to_rfc3339(), finding_id],
        )?;
        if changed > 0 {
            return Ok(());
        }

        let exists: bool = conn.query_row(
            "SELECT COUNT(*) FROM findings WHERE id = ?1",
            params![finding_id],
            |row| row.get::<_, i64>(0).map(|count| count > 0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(AuditError::FindingNotFound(finding_id))
        }
    }

    /// Aggregate statistics, computed from current rows on every call so
    /// they always reflect the present resolution state.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn();

        let total_scans: usize =
            conn.query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))?;
        let open_count: usize = conn.query_row(
            "SELECT COUNT(*) FROM findings WHERE status = 'open'",
            [],
            |row| row.get(0),
        )?;
        let resolved_count: usize = conn.query_row(
            "SELECT COUNT(*) FROM findings WHERE status = 'resolved'",
            [],
            |row| row.get(0),
        )?;

        let mut totals_by_severity = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT severity, COUNT(*) FROM findings WHERE status = 'open' GROUP BY severity",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
            })?;
            for row in rows {
                let (raw, count) = row?;
                if let Some(severity) = Severity::parse(&raw) {
                    totals_by_severity.insert(severity, count);
                }
            }
        }

        let mut totals_by_service = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT service, COUNT(*) FROM findings WHERE status = 'open' GROUP BY service",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
            })?;
            for row in rows {
                let (raw, count) = row?;
                if let Some(service) = Service::parse(&raw) {
                    totals_by_service.insert(service, count);
                }
            }
        }

        let latest_scan = conn
            .query_row(
                &format!("SELECT {SCAN_COLUMNS} FROM scans ORDER BY id DESC LIMIT 1"),
                [],
                scan_from_row,
            )
            .optional()?
            .map(|scan| scan.summary);

        Ok(StoreStats {
            total_scans,
            open_count,
            resolved_count,
            totals_by_severity,
            totals_by_service,
            latest_scan,
        })
    }
}

fn decode_err(what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("invalid {what}: {value}").into(),
    )
}

fn parse_ts(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| decode_err("timestamp", value))
}

fn scan_from_row(row: &Row<'_>) -> rusqlite::Result<ScanRecord> {
    let scan_type_raw: String = row.get(1)?;
    let start_raw: String = row.get(2)?;
    let end_raw: Option<String> = row.get(3)?;
    let status_raw: String = row.get(4)?;
    let notes_raw: String = row.get(9)?;

    Ok(ScanRecord {
        id: row.get(0)?,
        scan_type: ScanType::parse(&scan_type_raw)
            .ok_or_else(|| decode_err("scan type", &scan_type_raw))?,
        start_time: parse_ts(&start_raw)?,
        end_time: end_raw.as_deref().map(parse_ts).transpose()?,
        status: ScanStatus::parse(&status_raw)
            .ok_or_else(|| decode_err("scan status", &status_raw))?,
        summary: ScanSummary {
            critical: row.get(5)?,
            high: row.get(6)?,
            medium: row.get(7)?,
            low: row.get(8)?,
        },
        service_status: serde_json::from_str(&notes_raw)
            .map_err(|_| decode_err("service status", &notes_raw))?,
    })
}

fn finding_from_row(row: &Row<'_>) -> rusqlite::Result<FindingRecord> {
    let service_raw: String = row.get(2)?;
    let severity_raw: String = row.get(8)?;
    let status_raw: String = row.get(10)?;
    let created_raw: String = row.get(13)?;
    let resolved_raw: Option<String> = row.get(14)?;

    Ok(FindingRecord {
        id: row.get(0)?,
        check_id: row.get(1)?,
        service: Service::parse(&service_raw)
            .ok_or_else(|| decode_err("service", &service_raw))?,
        resource_id: row.get(3)?,
        resource_name: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        recommendation: row.get(7)?,
        severity: Severity::parse(&severity_raw)
            .ok_or_else(|| decode_err("severity", &severity_raw))?,
        risk_score: row.get(9)?,
        status: FindingStatus::parse(&status_raw)
            .ok_or_else(|| decode_err("finding status", &status_raw))?,
        first_seen_scan_id: row.get(11)?,
        last_seen_scan_id: row.get(12)?,
        created_at: parse_ts(&created_raw)?,
        resolved_at: resolved_raw.as_deref().map(parse_ts).transpose()?,
    })
}

fn scan_by_id(conn: &Connection, scan_id: i64) -> Result<ScanRecord> {
    conn.query_row(
        &format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = ?1"),
        params![scan_id],
        scan_from_row,
    )
    .optional()?
    .ok_or(AuditError::ScanNotFound(scan_id))
}

fn summary_for(conn: &Connection, scan_id: i64) -> Result<ScanSummary> {
    let mut stmt = conn.prepare(
        "SELECT severity, COUNT(*) FROM findings \
         WHERE last_seen_scan_id = ?1 GROUP BY severity",
    )?;
    let rows = stmt.query_map(params![scan_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
    })?;

    let mut summary = ScanSummary::default();
    for row in rows {
        let (raw, count) = row?;
        match Severity::parse(&raw) {
            Some(Severity::Critical) => summary.critical = count,
            Some(Severity::High) => summary.high = count,
            Some(Severity::Medium) => summary.medium = count,
            Some(Severity::Low) => summary.low = count,
            None => {}
        }
    }
    Ok(summary)
}
