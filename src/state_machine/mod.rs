mod job;
mod state;

pub use job::{JobOutcome, JobSpec, JobSummary};
pub use state::{Observation, PollMachine, PollState, PollTimings, Transition};

#[cfg(test)]
pub(crate) use state::summary;
