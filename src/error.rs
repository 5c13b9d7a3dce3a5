use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::awx::AwxError;

/// Every way a build can stop short of `successful`.
///
/// Serialized with a `kind` tag so the relay can hand the exact error back to the
/// host that delegated the build.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildError {
    /// Inventory/group mismatch or a missing required value. Not retried.
    #[error("{message}")]
    Configuration { message: String },

    /// The platform rejected our credentials.
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// The launched job itself reported failure.
    #[error("{template} failed at {at}. Check job id {job_id} for more info")]
    JobFailure {
        template: String,
        job_id: u64,
        at: String,
    },

    /// Polling exceeded the ceiling; usually a platform problem, not a job problem.
    #[error(
        "job ID {job_id} didn't complete after {elapsed_secs} seconds, something is probably wrong with AWX"
    )]
    Timeout { job_id: u64, elapsed_secs: u64 },

    /// Network or client-library failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Post-build cleanup on the host failed.
    #[error("cleanup failed: {message}")]
    Cleanup { message: String },
}

/// Discriminant of [`BuildError`], used for HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    AccessDenied,
    JobFailure,
    Timeout,
    Transport,
    Cleanup,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::AccessDenied => write!(f, "access denied"),
            ErrorKind::JobFailure => write!(f, "job failure"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Cleanup => write!(f, "cleanup"),
        }
    }
}

impl BuildError {
    pub fn configuration(message: impl Into<String>) -> Self {
        BuildError::Configuration {
            message: message.into(),
        }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        BuildError::AccessDenied {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        BuildError::Transport {
            message: message.into(),
        }
    }

    pub fn cleanup(message: impl Into<String>) -> Self {
        BuildError::Cleanup {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Configuration { .. } => ErrorKind::Configuration,
            BuildError::AccessDenied { .. } => ErrorKind::AccessDenied,
            BuildError::JobFailure { .. } => ErrorKind::JobFailure,
            BuildError::Timeout { .. } => ErrorKind::Timeout,
            BuildError::Transport { .. } => ErrorKind::Transport,
            BuildError::Cleanup { .. } => ErrorKind::Cleanup,
        }
    }
}

/// Platform errors that reach the build boundary without a more specific
/// classification. Unauthorized responses become [`BuildError::AccessDenied`];
/// everything else is transport.
impl From<AwxError> for BuildError {
    fn from(err: AwxError) -> Self {
        if err.is_unauthorized() {
            BuildError::access_denied(format!(
                "ensure the correct credentials are in place and the user has access in AWX ({err})"
            ))
        } else {
            BuildError::transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failure_display_names_template_and_job() {
        let err = BuildError::JobFailure {
            template: "Baseline Apply".into(),
            job_id: 1234,
            at: "14:02:11 UTC".into(),
        };
        assert_eq!(
            err.to_string(),
            "Baseline Apply failed at 14:02:11 UTC. Check job id 1234 for more info"
        );
        assert_eq!(err.kind(), ErrorKind::JobFailure);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = BuildError::Timeout {
            job_id: 9,
            elapsed_secs: 1810,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["job_id"], 9);

        let back: BuildError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn unauthorized_platform_error_is_access_denied() {
        let err = BuildError::from(AwxError::Api {
            status: 401,
            message: "Authentication credentials were not provided.".into(),
        });
        assert_eq!(err.kind(), ErrorKind::AccessDenied);

        let err = BuildError::from(AwxError::Api {
            status: 500,
            message: "boom".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BuildError>();
    }
}
