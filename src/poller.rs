use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::awx::AutomationApi;
use crate::state_machine::{
    JobOutcome, Observation, PollMachine, PollState, PollTimings, Transition,
};

/// Suspension point for the poll loop. Swapped for a recording fake in tests.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Drives a [`PollMachine`] against the platform until the job is terminal.
pub struct StatusPoller<'a, A, S> {
    api: &'a A,
    sleeper: &'a S,
    timings: PollTimings,
}

impl<'a, A: AutomationApi, S: Sleeper> StatusPoller<'a, A, S> {
    pub fn new(api: &'a A, sleeper: &'a S, timings: PollTimings) -> Self {
        Self {
            api,
            sleeper,
            timings,
        }
    }

    /// Wait for `job_id` to finish. A failed status query ends the poll.
    pub async fn await_job(&self, job_id: u64, template: &str) -> JobOutcome {
        let machine = PollMachine::new(job_id, template, self.timings);
        let mut elapsed = Duration::ZERO;
        let mut summaries = Vec::new();
        let mut observation = Observation::Submitted;

        loop {
            let transition = machine.next(elapsed, observation);
            if let Some(state) = transition.state() {
                debug!(job_id, %state, elapsed = elapsed.as_secs(), "poll transition");
            }
            match transition {
                Transition::Wait { state, delay } => {
                    if state == PollState::Submitted {
                        info!("Waiting {}s for job {job_id} to start...", delay.as_secs());
                    }
                    self.sleeper.sleep(delay).await;
                    elapsed += delay;
                    observation = Observation::Woke;
                }
                Transition::Query => match self.api.host_summaries(job_id).await {
                    Ok(batch) => {
                        summaries = batch;
                        observation = Observation::Summaries(&summaries);
                    }
                    Err(e) => {
                        let context = format!("fetching host summaries for job {job_id}");
                        let outcome = JobOutcome::api_failure(context, &e);
                        warn!("{outcome}");
                        return outcome;
                    }
                },
                Transition::Complete(outcome) => {
                    if !outcome.is_success() {
                        warn!("{outcome}");
                    }
                    return outcome;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::Sleeper;

    /// Returns immediately and records every requested delay.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn total(&self) -> Duration {
            self.delays.lock().unwrap().iter().sum()
        }
    }

    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }
}
