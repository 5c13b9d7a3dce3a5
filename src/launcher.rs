use tracing::{error, info};

use crate::awx::{AutomationApi, JobStatus};
use crate::marker::MarkerStore;
use crate::poller::{Sleeper, StatusPoller};
use crate::state_machine::{JobOutcome, JobSpec, JobSummary, PollTimings};

/// Launches one template at most once per host.
pub struct JobLauncher<'a, A, M, S> {
    api: &'a A,
    markers: &'a M,
    poller: StatusPoller<'a, A, S>,
}

impl<'a, A: AutomationApi, M: MarkerStore, S: Sleeper> JobLauncher<'a, A, M, S> {
    pub fn new(api: &'a A, markers: &'a M, sleeper: &'a S, timings: PollTimings) -> Self {
        Self {
            api,
            markers,
            poller: StatusPoller::new(api, sleeper, timings),
        }
    }

    /// Submit `spec`, wait for it, and record completion on success.
    ///
    /// A marker from an earlier run short-circuits to success without touching
    /// the platform.
    pub async fn launch(&self, spec: &JobSpec) -> JobOutcome {
        if self.markers.exists(&spec.target_host, &spec.template_name) {
            info!(
                "{} already completed for {}, not launching it again",
                spec.template_name, spec.target_host
            );
            return JobOutcome::Succeeded {
                summary: JobSummary {
                    job_id: None,
                    template: spec.template_name.clone(),
                    status: JobStatus::Successful,
                },
            };
        }

        info!("Kicking off {}...", spec.template_name);
        let job = match self
            .api
            .launch_template(spec.template_id, &spec.parameters)
            .await
        {
            Ok(job) => job,
            Err(e) => {
                let context = format!("launching {}", spec.template_name);
                return JobOutcome::api_failure(context, &e);
            }
        };

        let outcome = self.poller.await_job(job.id, &spec.template_name).await;
        if let JobOutcome::Succeeded { summary } = &outcome {
            info!("Status of {}: {}", summary.template, summary.status);
            // The job did succeed; a lost marker only means a repeat launch after restart.
            if let Err(e) = self.markers.create(&spec.target_host, &spec.template_name) {
                error!(
                    "could not record completion of {} for {}: {e}",
                    spec.template_name, spec.target_host
                );
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{HostType, sample_context};
    use crate::marker::fakes::MemoryMarkers;
    use crate::poller::fakes::RecordingSleeper;
    use crate::testing::{Call, FakeApi};

    #[tokio::test]
    async fn existing_marker_skips_submission() {
        let ctx = sample_context(HostType::Internal);
        let api = FakeApi::default();
        let markers = MemoryMarkers::default().with(&ctx.fqdn, "Breakglass");
        let sleeper = RecordingSleeper::default();

        let outcome = JobLauncher::new(&api, &markers, &sleeper, PollTimings::default())
            .launch(&JobSpec::breakglass(&ctx))
            .await;

        assert!(outcome.is_success());
        assert!(api.calls().is_empty());
        assert_eq!(sleeper.total().as_secs(), 0);
    }

    #[tokio::test]
    async fn success_writes_marker_after_poll() {
        let ctx = sample_context(HostType::Internal);
        let api = FakeApi::default();
        api.finish_template(15, JobStatus::Successful);
        let markers = MemoryMarkers::default();
        let sleeper = RecordingSleeper::default();
        let launcher = JobLauncher::new(&api, &markers, &sleeper, PollTimings::default());

        let outcome = launcher.launch(&JobSpec::breakglass(&ctx)).await;

        assert!(outcome.is_success());
        assert!(markers.exists(&ctx.fqdn, "Breakglass"));
        assert_eq!(api.calls(), vec![Call::Launch(15), Call::Summaries(1015)]);

        // A second launch, e.g. after a reboot, never reaches the platform.
        let again = launcher.launch(&JobSpec::breakglass(&ctx)).await;
        assert!(again.is_success());
        assert_eq!(api.launches(), vec![15]);
    }

    #[tokio::test]
    async fn failed_job_leaves_no_marker() {
        let ctx = sample_context(HostType::Internal);
        let api = FakeApi::default();
        api.finish_template(16, JobStatus::Failed);
        let markers = MemoryMarkers::default();
        let sleeper = RecordingSleeper::default();

        let outcome = JobLauncher::new(&api, &markers, &sleeper, PollTimings::default())
            .launch(&JobSpec::baseline(&ctx))
            .await;

        assert!(matches!(outcome, JobOutcome::Failed { job_id: 1016, .. }));
        assert!(!markers.exists(&ctx.fqdn, "Baseline Apply"));
    }

    #[tokio::test]
    async fn submission_error_is_transport_without_polling() {
        let ctx = sample_context(HostType::Internal);
        let api = FakeApi::default();
        api.fail_launch(400);
        let markers = MemoryMarkers::default();
        let sleeper = RecordingSleeper::default();

        let outcome = JobLauncher::new(&api, &markers, &sleeper, PollTimings::default())
            .launch(&JobSpec::breakglass(&ctx))
            .await;

        assert!(matches!(outcome, JobOutcome::TransportError { .. }));
        assert_eq!(api.summary_queries(), 0);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_credentials_at_launch_are_access_denied() {
        let ctx = sample_context(HostType::Internal);
        let api = FakeApi::default();
        api.fail_launch(401);
        let markers = MemoryMarkers::default();
        let sleeper = RecordingSleeper::default();

        let outcome = JobLauncher::new(&api, &markers, &sleeper, PollTimings::default())
            .launch(&JobSpec::breakglass(&ctx))
            .await;

        assert!(matches!(outcome, JobOutcome::AccessDenied { .. }));
        assert_eq!(api.summary_queries(), 0);
        assert!(!markers.exists(&ctx.fqdn, "Breakglass"));
    }

    #[tokio::test]
    async fn marker_write_failure_keeps_success() {
        let ctx = sample_context(HostType::Internal);
        let api = FakeApi::default();
        let markers = MemoryMarkers::read_only();
        let sleeper = RecordingSleeper::default();

        let outcome = JobLauncher::new(&api, &markers, &sleeper, PollTimings::default())
            .launch(&JobSpec::breakglass(&ctx))
            .await;

        assert!(outcome.is_success());
        assert!(!markers.exists(&ctx.fqdn, "Breakglass"));
    }
}
