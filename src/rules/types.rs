use serde::{Deserialize, Serialize};

use crate::snapshot::{AccountContext, ResourceSnapshot, Service};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Open,
    Resolved,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Open => "open",
            FindingStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(FindingStatus::Open),
            "resolved" => Some(FindingStatus::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a check reports when it fires: the per-instance description and
/// the risk score (fixed at registration time, or computed from resource
/// content via `scoring` helpers).
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub description: String,
    pub risk_score: u8,
}

/// One named rule. Checks are pure functions over a single snapshot plus
/// account context; an inapplicable or unexpectedly-shaped resource yields
/// `None`, never an error.
pub struct Check {
    /// Stable identifier, used for deduplication across scans.
    pub id: &'static str,
    pub service: Service,
    pub title: &'static str,
    pub description: &'static str,
    pub recommendation: &'static str,
    pub eval: fn(&ResourceSnapshot, &AccountContext) -> Option<CheckOutcome>,
}

impl Check {
    pub fn evaluate(
        &self,
        snapshot: &ResourceSnapshot,
        ctx: &AccountContext,
    ) -> Option<DraftFinding> {
        if snapshot.service() != self.service {
            return None;
        }
        (self.eval)(snapshot, ctx).map(|outcome| DraftFinding::new(self, snapshot, outcome))
    }
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check")
            .field("id", &self.id)
            .field("service", &self.service)
            .field("title", &self.title)
            .finish()
    }
}

/// A detected misconfiguration before the store assigns lifecycle fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftFinding {
    pub check_id: String,
    pub service: Service,
    pub resource_id: String,
    pub resource_name: String,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub risk_score: u8,
}

impl DraftFinding {
    pub fn new(check: &Check, snapshot: &ResourceSnapshot, outcome: CheckOutcome) -> Self {
        Self {
            check_id: check.id.to_string(),
            service: check.service,
            resource_id: snapshot.resource_id().to_string(),
            resource_name: snapshot.resource_name().to_string(),
            title: check.title.to_string(),
            description: outcome.description,
            recommendation: check.recommendation.to_string(),
            risk_score: outcome.risk_score,
        }
    }

    /// Severity is always the band implied by the risk score.
    pub fn severity(&self) -> Severity {
        Severity::from_score(self.risk_score)
    }
}
