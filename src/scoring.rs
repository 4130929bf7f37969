//! Risk scoring: the fixed severity bands over 1-10 scores, plus the
//! deterministic helpers for checks whose score depends on resource
//! content. Everything here is a pure function of its arguments.

use crate::rules::Severity;
use crate::snapshot::{AclGrantee, PublicAccessBlock};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// Ports whose exposure to the internet is treated as critical:
/// remote-access and database services.
pub const CRITICAL_PORTS: &[(u16, &str)] = &[
    (22, "SSH"),
    (3389, "RDP"),
    (1433, "SQL Server"),
    (3306, "MySQL"),
    (5432, "PostgreSQL"),
    (27017, "MongoDB"),
    (6379, "Redis"),
];

/// Ports expected to face the internet; open ingress on these alone is
/// not flagged.
pub const WEB_PORTS: &[u16] = &[80, 443];

impl Severity {
    /// Fixed band mapping: 9-10 critical, 7-8 high, 4-6 medium, 1-3 low.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=3 => Severity::Low,
            4..=6 => Severity::Medium,
            7..=8 => Severity::High,
            _ => Severity::Critical,
        }
    }
}

pub fn critical_port_name(port: u16) -> Option<&'static str> {
    CRITICAL_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

pub fn is_web_port(port: u16) -> bool {
    WEB_PORTS.contains(&port)
}

/// Score for a single port exposed to the world. Critical-set ports score
/// 9, anything else 7.
pub fn open_port_score(port: u16) -> u8 {
    if critical_port_name(port).is_some() {
        9
    } else {
        7
    }
}

/// Score for an active access key idle past the staleness threshold.
pub fn unused_key_score(days_idle: i64) -> u8 {
    if days_idle > 180 { 8 } else { 6 }
}

/// Score for a public ACL grant by grantee class.
pub fn acl_grant_score(grantee: AclGrantee) -> u8 {
    match grantee {
        AclGrantee::AllUsers => 10,
        AclGrantee::AuthenticatedUsers => 8,
    }
}

/// Score for a bucket's public-access block state: `None` means no block
/// is configured at all (worst), a partial block scores one lower, and a
/// fully blocking configuration yields no score.
pub fn public_access_block_score(block: Option<&PublicAccessBlock>) -> Option<u8> {
    match block {
        None => Some(10),
        Some(block) if !block.fully_blocking() => Some(9),
        Some(_) => None,
    }
}

/// Score for a weak (but present) password policy.
pub fn password_policy_score(length_below_minimum: bool) -> u8 {
    if length_below_minimum { 6 } else { 5 }
}
