//! Scan orchestration.
//!
//! A scan is one pass of the rule catalog over the current snapshots of the
//! selected services. Services degrade independently: a provider or storage
//! failure for one service becomes that service's failure note, and the
//! scan only fails as a whole when every requested service failed (or the
//! caller aborted). Check evaluation is pure, so resources are evaluated in
//! parallel; the store serializes the writes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, TryLockError};

use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AuditError, Result};
use crate::rules::{self, DraftFinding, Severity};
use crate::snapshot::{AccountContext, ScanType, Service, SnapshotProvider};
use crate::store::{FindingStore, ScanStatus, ScanSummary, ServiceStatus};

/// Cooperative abort signal, checked between services. Findings recorded
/// before the abort stay intact; the scan is sealed as failed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the caller observes once a scan is sealed.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub scan_id: i64,
    pub status: ScanStatus,
    pub summary: ScanSummary,
    pub service_status: BTreeMap<Service, ServiceStatus>,
}

pub struct ScanEngine<'a> {
    provider: &'a dyn SnapshotProvider,
    store: &'a FindingStore,
    ctx: AccountContext,
    cancel: CancelToken,
    running: Mutex<()>,
}

impl<'a> ScanEngine<'a> {
    pub fn new(
        provider: &'a dyn SnapshotProvider,
        store: &'a FindingStore,
        ctx: AccountContext,
    ) -> Self {
        Self {
            provider,
            store,
            ctx,
            cancel: CancelToken::new(),
            running: Mutex::new(()),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one scan. Only one scan per engine may run at a time; a second
    /// caller gets `ScanInProgress` instead of racing the reconciliation.
    pub fn run(&self, scan_type: ScanType) -> Result<ScanOutcome> {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(AuditError::ScanInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let scan_id = self.store.begin_scan(scan_type, Utc::now())?;
        info!(scan_id, scan_type = scan_type.as_str(), "starting scan");

        let mut service_status = BTreeMap::new();
        let mut aborted = false;

        for &service in scan_type.services() {
            if self.cancel.is_cancelled() {
                warn!(scan_id, "scan aborted by caller");
                aborted = true;
                break;
            }

            match self.scan_service(scan_id, service) {
                Ok(status) => {
                    service_status.insert(service, status);
                }
                Err(err) => {
                    warn!(
                        scan_id,
                        service = service.as_str(),
                        error = %err,
                        "service scan failed"
                    );
                    service_status.insert(
                        service,
                        ServiceStatus::Failed {
                            message: err.to_string(),
                        },
                    );
                }
            }
        }

        let every_service_failed = service_status
            .values()
            .all(|status| matches!(status, ServiceStatus::Failed { .. }));
        let status = if aborted || every_service_failed {
            ScanStatus::Failed
        } else {
            ScanStatus::Completed
        };

        let record = self.store.seal(scan_id, status, &service_status, Utc::now())?;
        info!(
            scan_id,
            status = status.as_str(),
            findings = record.summary.total(),
            "scan sealed"
        );

        Ok(ScanOutcome {
            scan_id: record.id,
            status: record.status,
            summary: record.summary,
            service_status: record.service_status,
        })
    }

    fn scan_service(&self, scan_id: i64, service: Service) -> Result<ServiceStatus> {
        let snapshots = self.provider.fetch(service)?;
        debug!(
            service = service.as_str(),
            resources = snapshots.len(),
            "evaluating catalog"
        );

        let drafts: Vec<DraftFinding> = snapshots
            .par_iter()
            .flat_map_iter(|snapshot| {
                rules::checks_for(service)
                    .filter_map(move |check| check.evaluate(snapshot, &self.ctx))
            })
            .collect();

        for draft in &drafts {
            let message = format!(
                "{} - {}: {} (risk score: {})",
                draft.service, draft.title, draft.description, draft.risk_score
            );
            if draft.severity() >= Severity::High {
                warn!(check_id = %draft.check_id, "{message}");
            } else {
                info!(check_id = %draft.check_id, "{message}");
            }
        }

        let recorded = self.store.record(scan_id, &drafts, Utc::now())?;

        let covered: HashSet<String> = snapshots
            .iter()
            .map(|snapshot| snapshot.resource_id().to_string())
            .collect();
        let resolved = self
            .store
            .reconcile(scan_id, service, &covered, Utc::now())?;

        info!(
            service = service.as_str(),
            resources = snapshots.len(),
            findings = drafts.len(),
            created = recorded.created,
            refreshed = recorded.refreshed,
            resolved,
            "service scan complete"
        );

        Ok(ServiceStatus::Ok {
            resources: snapshots.len(),
            findings: drafts.len(),
        })
    }
}
