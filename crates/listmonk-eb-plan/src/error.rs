//! Plan construction error types

use listmonk_eb_types::{DuplicateOption, LogicalId, ParameterError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, validating or loading a plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("resource {0} is declared twice")]
    DuplicateResource(LogicalId),

    #[error("resource {resource} depends on {missing}, which is not in the plan")]
    DanglingDependency {
        resource: LogicalId,
        missing: LogicalId,
    },

    #[error("resource {resource} references {target} without a declared dependency")]
    UndeclaredDependency {
        resource: LogicalId,
        target: LogicalId,
    },

    #[error("dependency cycle through {0}")]
    Cycle(LogicalId),

    #[error("option table error: {0}")]
    Option(#[from] DuplicateOption),

    #[error("boundary {boundary} may not accept traffic from any address")]
    OpenIngress { boundary: String },

    #[error("output {0} would expose secret material")]
    SecretInOutput(String),

    #[error("output {0} is declared twice")]
    DuplicateOutput(String),

    #[error("bundle directory {path} is not usable: {reason}")]
    Bundle { path: PathBuf, reason: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("teardown blocked: deletion protection is enabled on {}; disable it before deleting", join_ids(.0))]
    DeletionProtected(Vec<LogicalId>),
}

fn join_ids(ids: &[LogicalId]) -> String {
    ids.iter().map(LogicalId::as_str).collect::<Vec<_>>().join(", ")
}

/// Result type for plan operations
pub type Result<T> = std::result::Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_errors_convert() {
        let err: PlanError = ParameterError::Missing("AcmCertArn").into();
        assert!(matches!(err, PlanError::Parameter(_)));
        assert!(err.to_string().contains("AcmCertArn"));
    }

    #[test]
    fn deletion_protected_lists_resources() {
        let err = PlanError::DeletionProtected(vec![LogicalId::new("listmonkAuroraPg1234ABCD")]);
        let msg = err.to_string();
        assert!(msg.contains("listmonkAuroraPg1234ABCD"));
        assert!(msg.contains("disable it"));
    }

    #[test]
    fn error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(PlanError::Cycle(LogicalId::new("A")));
        assert!(e.to_string().contains("cycle"));
    }
}
