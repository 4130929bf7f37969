//! Resource snapshot model and the provider seam.
//!
//! Snapshots are normalized, read-only descriptions of cloud resources,
//! produced per scan by an external collector. The core never talks to a
//! cloud API: it consumes a `SnapshotProvider`, of which the JSON-document
//! provider is the concrete implementation shipped with the CLI.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AuditError, Result};

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
pub enum Service {
    Identity,
    Storage,
    Compute,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Identity, Service::Storage, Service::Compute];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Identity => "identity",
            Service::Storage => "storage",
            Service::Compute => "compute",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "identity" => Some(Service::Identity),
            "storage" => Some(Service::Storage),
            "compute" => Some(Service::Compute),
            _ => None,
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which services a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    #[default]
    All,
    Identity,
    Storage,
    Compute,
}

impl ScanType {
    pub fn services(&self) -> &'static [Service] {
        match self {
            ScanType::All => &Service::ALL,
            ScanType::Identity => &[Service::Identity],
            ScanType::Storage => &[Service::Storage],
            ScanType::Compute => &[Service::Compute],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::All => "all",
            ScanType::Identity => "identity",
            ScanType::Storage => "storage",
            ScanType::Compute => "compute",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(ScanType::All),
            "identity" => Some(ScanType::Identity),
            "storage" => Some(ScanType::Storage),
            "compute" => Some(ScanType::Compute),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessKey {
    pub key_id: String,
    #[serde(default)]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PublicAccessBlock {
    #[serde(default)]
    pub block_public_acls: bool,
    #[serde(default)]
    pub block_public_policy: bool,
    #[serde(default)]
    pub ignore_public_acls: bool,
    #[serde(default)]
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub fn fully_blocking(&self) -> bool {
        self.block_public_acls
            && self.block_public_policy
            && self.ignore_public_acls
            && self.restrict_public_buckets
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclGrantee {
    AllUsers,
    AuthenticatedUsers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclGrant {
    pub grantee: AclGrantee,
    pub permission: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngressRule {
    /// Protocol: "tcp", "udp", or "-1" for all.
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port: Option<u16>,
    #[serde(default)]
    pub ipv4_sources: Vec<String>,
    #[serde(default)]
    pub ipv6_sources: Vec<String>,
}

impl IngressRule {
    pub fn open_to_world(&self) -> bool {
        self.ipv4_sources.iter().any(|cidr| cidr == "0.0.0.0/0")
    }

    pub fn open_to_world_v6(&self) -> bool {
        self.ipv6_sources.iter().any(|cidr| cidr == "::/0")
    }

    pub fn all_ports(&self) -> bool {
        self.protocol == "-1"
            || (self.from_port.unwrap_or(0) == 0 && self.to_port.unwrap_or(65535) == 65535)
    }
}

/// One resource's configuration at capture time. Immutable; produced per
/// scan and never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceSnapshot {
    Principal {
        id: String,
        name: String,
        #[serde(default)]
        is_root: bool,
        #[serde(default)]
        mfa_enabled: bool,
        #[serde(default)]
        console_access: bool,
        #[serde(default)]
        attached_policies: Vec<String>,
        #[serde(default)]
        inline_policy_count: u32,
        #[serde(default)]
        access_keys: Vec<AccessKey>,
    },
    PasswordPolicy {
        #[serde(default)]
        configured: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum_length: Option<u32>,
        #[serde(default)]
        require_symbols: bool,
        #[serde(default)]
        require_numbers: bool,
    },
    Bucket {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_access_block: Option<PublicAccessBlock>,
        #[serde(default)]
        encryption_enabled: bool,
        #[serde(default)]
        versioning_enabled: bool,
        #[serde(default)]
        logging_enabled: bool,
        #[serde(default)]
        wildcard_principal_policy: bool,
        #[serde(default)]
        acl_grants: Vec<AclGrant>,
    },
    SecurityGroup {
        id: String,
        name: String,
        #[serde(default)]
        ingress_rules: Vec<IngressRule>,
    },
    Instance {
        id: String,
        #[serde(default)]
        running: bool,
        #[serde(default)]
        tags: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_ip: Option<String>,
        #[serde(default)]
        imds_v2_required: bool,
        #[serde(default)]
        monitoring_enabled: bool,
    },
    Volume {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        encrypted: bool,
        #[serde(default)]
        size_gb: u32,
    },
    BlockSnapshot {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume_id: Option<String>,
        #[serde(default)]
        public: bool,
    },
}

impl ResourceSnapshot {
    pub fn service(&self) -> Service {
        match self {
            ResourceSnapshot::Principal { .. } | ResourceSnapshot::PasswordPolicy { .. } => {
                Service::Identity
            }
            ResourceSnapshot::Bucket { .. } => Service::Storage,
            ResourceSnapshot::SecurityGroup { .. }
            | ResourceSnapshot::Instance { .. }
            | ResourceSnapshot::Volume { .. }
            | ResourceSnapshot::BlockSnapshot { .. } => Service::Compute,
        }
    }

    /// Stable identifier of the resource within its service. Account-level
    /// subjects carry fixed ids so they participate in the finding
    /// lifecycle like any other resource.
    pub fn resource_id(&self) -> &str {
        match self {
            ResourceSnapshot::Principal { id, .. } => id,
            ResourceSnapshot::PasswordPolicy { .. } => "password-policy",
            ResourceSnapshot::Bucket { name, .. } => name,
            ResourceSnapshot::SecurityGroup { id, .. } => id,
            ResourceSnapshot::Instance { id, .. } => id,
            ResourceSnapshot::Volume { id, .. } => id,
            ResourceSnapshot::BlockSnapshot { id, .. } => id,
        }
    }

    pub fn resource_name(&self) -> &str {
        match self {
            ResourceSnapshot::Principal { name, .. } => name,
            ResourceSnapshot::PasswordPolicy { .. } => "Account Password Policy",
            ResourceSnapshot::Bucket { name, .. } => name,
            ResourceSnapshot::SecurityGroup { name, .. } => name,
            ResourceSnapshot::Instance { id, tags, .. } => {
                tags.get("Name").map(String::as_str).unwrap_or(id)
            }
            ResourceSnapshot::Volume { id, name, .. } => {
                name.as_deref().unwrap_or(id)
            }
            ResourceSnapshot::BlockSnapshot { id, .. } => id,
        }
    }
}

/// Read-only account-wide context handed to every check. The capture time
/// is explicit so staleness checks stay deterministic and testable.
#[derive(Debug, Clone)]
pub struct AccountContext {
    pub captured_at: DateTime<Utc>,
    pub unused_key_days: i64,
    pub stale_key_days: i64,
    pub min_password_length: u32,
    pub required_tags: Vec<String>,
}

impl AccountContext {
    pub fn new(captured_at: DateTime<Utc>, config: &Config) -> Self {
        Self {
            captured_at,
            unused_key_days: config.unused_key_days,
            stale_key_days: config.stale_key_days,
            min_password_length: config.min_password_length,
            required_tags: config.required_tags.clone(),
        }
    }
}

/// Pull interface for resource snapshots. Fetching may fail per service;
/// one service's unavailability must never abort a whole scan.
pub trait SnapshotProvider: Send + Sync {
    fn fetch(&self, service: Service) -> Result<Vec<ResourceSnapshot>>;

    /// When the provider knows when its data was captured.
    fn captured_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Snapshot document layout: capture timestamp plus per-service resource
/// lists. A service absent from the document is reported as a provider
/// failure for that service, not as an empty resource set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub services: BTreeMap<Service, Vec<ResourceSnapshot>>,
}

/// Provider over a snapshot document exported by an external collector.
pub struct JsonSnapshotProvider {
    document: SnapshotDocument,
}

impl JsonSnapshotProvider {
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| AuditError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        let document =
            serde_json::from_str(&content).map_err(|e| AuditError::ParseError {
                path: path.display().to_string(),
                source: e,
            })?;

        Ok(Self { document })
    }

    pub fn from_document(document: SnapshotDocument) -> Self {
        Self { document }
    }
}

impl SnapshotProvider for JsonSnapshotProvider {
    fn fetch(&self, service: Service) -> Result<Vec<ResourceSnapshot>> {
        self.document
            .services
            .get(&service)
            .cloned()
            .ok_or_else(|| AuditError::Provider {
                service,
                message: "service absent from snapshot document".to_string(),
            })
    }

    fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.document.captured_at
    }
}
