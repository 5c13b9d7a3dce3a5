pub mod client;
pub mod error;
pub mod types;

pub use client::{AutomationApi, AwxClient};
pub use error::AwxError;
pub use types::{Group, Host, HostSummary, JobStatus, LaunchedJob, NewHost};
