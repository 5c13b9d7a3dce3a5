use std::fmt;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::job::{JobOutcome, JobSummary};
use crate::awx::{HostSummary, JobStatus};

/// States of an in-flight job as seen by the poller.
///
/// `Submitted → {Pending, Running} → {Succeeded, Failed}`, with `TimedOut`
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollState {
    Submitted,
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Submitted => write!(f, "SUBMITTED"),
            PollState::Pending => write!(f, "PENDING"),
            PollState::Running => write!(f, "RUNNING"),
            PollState::Succeeded => write!(f, "SUCCEEDED"),
            PollState::Failed => write!(f, "FAILED"),
            PollState::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

/// Poll cadence. Loaded from the `[poll]` table of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollTimings {
    /// Wait before the first status check; jobs take a while to start.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
    /// Wait between subsequent checks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Give up once cumulative waiting exceeds this.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_warmup_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    1800
}

impl PollTimings {
    /// Rejects settings under which polling never advances or never waits.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_secs == 0 {
            return Err("poll.interval_secs must be at least 1".into());
        }
        if self.timeout_secs == 0 {
            return Err("poll.timeout_secs must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for PollTimings {
    fn default() -> Self {
        Self {
            warmup_secs: default_warmup_secs(),
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What the poller has just seen.
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    /// The job was accepted by the platform.
    Submitted,
    /// A wait finished.
    Woke,
    /// A status query returned these summaries.
    Summaries(&'a [HostSummary]),
}

/// The next step the poller must take.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Sleep for `delay`, remaining in `state`.
    Wait { state: PollState, delay: Duration },
    /// Query the job's host summaries.
    Query,
    /// Terminal.
    Complete(JobOutcome),
}

impl Transition {
    pub fn state(&self) -> Option<PollState> {
        match self {
            Transition::Wait { state, .. } => Some(*state),
            Transition::Query => None,
            Transition::Complete(JobOutcome::Succeeded { .. }) => Some(PollState::Succeeded),
            Transition::Complete(JobOutcome::TimedOut { .. }) => Some(PollState::TimedOut),
            Transition::Complete(JobOutcome::Failed { .. }) => Some(PollState::Failed),
            // The job's own state was never observed.
            Transition::Complete(
                JobOutcome::TransportError { .. } | JobOutcome::AccessDenied { .. },
            ) => None,
        }
    }
}

/// Pure transition function for one job's polling.
///
/// Holds no clock: callers pass the cumulative time they have waited, so a
/// fixed sequence of observations always yields the same transitions.
pub struct PollMachine {
    job_id: u64,
    template: String,
    timings: PollTimings,
}

impl PollMachine {
    /// A zero interval is raised to one second so elapsed time always advances.
    pub fn new(job_id: u64, template: impl Into<String>, timings: PollTimings) -> Self {
        Self {
            job_id,
            template: template.into(),
            timings: PollTimings {
                interval_secs: timings.interval_secs.max(1),
                ..timings
            },
        }
    }

    pub fn next(&self, elapsed: Duration, observation: Observation<'_>) -> Transition {
        match observation {
            Observation::Submitted => Transition::Wait {
                state: PollState::Submitted,
                delay: Duration::from_secs(self.timings.warmup_secs),
            },
            Observation::Woke => {
                if elapsed.as_secs() > self.timings.timeout_secs {
                    Transition::Complete(JobOutcome::TimedOut {
                        job_id: self.job_id,
                        elapsed_secs: elapsed.as_secs(),
                    })
                } else {
                    Transition::Query
                }
            }
            Observation::Summaries(summaries) => self.classify(summaries),
        }
    }

    fn classify(&self, summaries: &[HostSummary]) -> Transition {
        // A failure anywhere in the batch wins over every other summary.
        if let Some(failed) = summaries.iter().find(|s| {
            s.failed || s.summary_fields.job.failed || s.summary_fields.job.status.is_failure()
        }) {
            let detail = &failed.summary_fields.job;
            let template = if detail.job_template_name.is_empty() {
                self.template.clone()
            } else {
                detail.job_template_name.clone()
            };
            return Transition::Complete(JobOutcome::Failed {
                reason: if failed.failed {
                    "host reported failure".to_string()
                } else {
                    detail.status.to_string()
                },
                template,
                job_id: failed.job,
                at: Utc::now(),
            });
        }

        if let Some(done) = summaries
            .iter()
            .find(|s| !s.summary_fields.job.status.is_in_flight())
        {
            return Transition::Complete(JobOutcome::Succeeded {
                summary: JobSummary {
                    job_id: Some(self.job_id),
                    template: self.template.clone(),
                    status: done.summary_fields.job.status,
                },
            });
        }

        let running = summaries
            .iter()
            .any(|s| s.summary_fields.job.status == JobStatus::Running);
        Transition::Wait {
            state: if running {
                PollState::Running
            } else {
                PollState::Pending
            },
            delay: Duration::from_secs(self.timings.interval_secs),
        }
    }
}

#[cfg(test)]
pub(crate) fn summary(job: u64, status: JobStatus, failed: bool) -> HostSummary {
    use crate::awx::types::{JobDetail, SummaryFields};

    HostSummary {
        job,
        failed,
        summary_fields: SummaryFields {
            job: JobDetail {
                status,
                failed: false,
                job_template_name: "Breakglass".into(),
            },
        },
    }
}
