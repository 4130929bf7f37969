use thiserror::Error;

use crate::snapshot::Service;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("snapshot provider failed for {service}: {message}")]
    Provider { service: Service, message: String },

    #[error("failed to read snapshot document: {path}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot document: {path}")]
    ParseError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load configuration: {path} - {message}")]
    Config { path: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scan not found: {0}")]
    ScanNotFound(i64),

    #[error("no scans recorded yet")]
    NoScans,

    #[error("finding not found: {0}")]
    FindingNotFound(i64),

    #[error("a scan of this store is already in progress")]
    ScanInProgress,
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_provider() {
        let err = AuditError::Provider {
            service: Service::Storage,
            message: "throttled".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "snapshot provider failed for storage: throttled"
        );
    }

    #[test]
    fn test_error_display_read_error() {
        let err = AuditError::ReadError {
            path: "/path/to/snapshots.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read snapshot document: /path/to/snapshots.json"
        );
    }

    #[test]
    fn test_error_display_scan_not_found() {
        let err = AuditError::ScanNotFound(42);
        assert_eq!(err.to_string(), "scan not found: 42");
    }

    #[test]
    fn test_error_display_config() {
        let err = AuditError::Config {
            path: ".cloud-audit.yaml".to_string(),
            message: "invalid yaml".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to load configuration: .cloud-audit.yaml - invalid yaml"
        );
    }

    #[test]
    fn test_error_display_scan_in_progress() {
        assert_eq!(
            AuditError::ScanInProgress.to_string(),
            "a scan of this store is already in progress"
        );
    }
}
