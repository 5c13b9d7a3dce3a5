use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::awx::{AwxError, JobStatus};
use crate::context::BuildContext;
use crate::error::BuildError;

/// A single template launch. Parameters are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub template_id: u64,
    pub template_name: String,
    pub parameters: Map<String, Value>,
    pub target_host: String,
}

impl JobSpec {
    /// Breakglass runs against just this host in the build inventory.
    pub fn breakglass(ctx: &BuildContext) -> Self {
        Self {
            template_id: ctx.breakglass.id,
            template_name: ctx.breakglass.name.clone(),
            parameters: limit_params(ctx),
            target_host: ctx.fqdn.clone(),
        }
    }

    /// Baseline additionally pins the desired release. Reboots are left to cleanup.
    pub fn baseline(ctx: &BuildContext) -> Self {
        let mut parameters = limit_params(ctx);
        parameters.insert(
            "extra_vars".into(),
            json!({ "desired_release": ctx.desired_release, "reboot": false }),
        );
        Self {
            template_id: ctx.baseline.id,
            template_name: ctx.baseline.name.clone(),
            parameters,
            target_host: ctx.fqdn.clone(),
        }
    }
}

fn limit_params(ctx: &BuildContext) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("inventory".into(), json!(ctx.inventory_id));
    params.insert("limit".into(), json!(ctx.fqdn));
    params
}

/// Terminal summary of a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// `None` when the launch was skipped because a completion marker exists.
    pub job_id: Option<u64>,
    pub template: String,
    pub status: JobStatus,
}

/// The result of launching and awaiting one job. Exactly one variant applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded {
        summary: JobSummary,
    },
    Failed {
        reason: String,
        template: String,
        job_id: u64,
        at: DateTime<Utc>,
    },
    TimedOut {
        job_id: u64,
        elapsed_secs: u64,
    },
    TransportError {
        cause: String,
    },
    /// AWX rejected the credentials while launching or polling.
    AccessDenied {
        cause: String,
    },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }

    /// A platform call failed before the job reached a terminal state.
    pub fn api_failure(context: impl std::fmt::Display, err: &AwxError) -> Self {
        let cause = format!("{context}: {err}");
        if err.is_unauthorized() {
            JobOutcome::AccessDenied { cause }
        } else {
            JobOutcome::TransportError { cause }
        }
    }

    /// Collapse into the build error taxonomy, keeping the outcome kind.
    pub fn into_result(self) -> Result<JobSummary, BuildError> {
        match self {
            JobOutcome::Succeeded { summary } => Ok(summary),
            JobOutcome::Failed {
                template,
                job_id,
                at,
                ..
            } => Err(BuildError::JobFailure {
                template,
                job_id,
                at: at.format("%H:%M:%S UTC").to_string(),
            }),
            JobOutcome::TimedOut {
                job_id,
                elapsed_secs,
            } => Err(BuildError::Timeout {
                job_id,
                elapsed_secs,
            }),
            JobOutcome::TransportError { cause } => Err(BuildError::transport(cause)),
            JobOutcome::AccessDenied { cause } => Err(BuildError::access_denied(cause)),
        }
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Succeeded { summary } => match summary.job_id {
                Some(id) => write!(f, "{} {} (job {id})", summary.template, summary.status),
                None => write!(f, "{} already completed", summary.template),
            },
            JobOutcome::Failed {
                template, reason, ..
            } => write!(f, "{template} failed ({reason})"),
            JobOutcome::TimedOut { elapsed_secs, .. } => {
                write!(f, "timed out after {elapsed_secs}s")
            }
            JobOutcome::TransportError { cause } => write!(f, "transport error: {cause}"),
            JobOutcome::AccessDenied { cause } => write!(f, "access denied: {cause}"),
        }
    }
}
