//! In-memory stand-in for the AWX API, shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::awx::{
    AutomationApi, AwxError, Group, Host, HostSummary, JobStatus, LaunchedJob, NewHost,
};
use crate::state_machine::summary;

const JOB_ID_OFFSET: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListHosts(String),
    CreateHost(String, u64),
    ListGroups(String),
    HostGroups(u64),
    Associate { host_id: u64, group_id: u64 },
    Launch(u64),
    Summaries(u64),
}

/// Records every call. Launching template `t` yields job `t + 1000`; that job
/// reports whatever status was set with [`FakeApi::finish_template`].
#[derive(Default)]
pub struct FakeApi {
    hosts: Mutex<Vec<Host>>,
    groups: Mutex<Vec<Group>>,
    memberships: Mutex<Vec<(u64, u64)>>,
    queued_summaries: Mutex<VecDeque<Vec<HostSummary>>>,
    default_summaries: Mutex<Option<Vec<HostSummary>>>,
    template_status: Mutex<HashMap<u64, JobStatus>>,
    groups_error: Mutex<Option<u16>>,
    associate_error: Mutex<Option<u16>>,
    launch_error: Mutex<Option<u16>>,
    summaries_error: Mutex<Option<u16>>,
    calls: Mutex<Vec<Call>>,
}

fn api_error(status: u16) -> AwxError {
    AwxError::Api {
        status,
        message: format!("fake status {status}"),
    }
}

impl FakeApi {
    pub fn with_host(self, id: u64, name: &str, inventory: u64) -> Self {
        self.hosts.lock().unwrap().push(Host {
            id,
            name: name.into(),
            inventory,
        });
        self
    }

    pub fn with_group(self, id: u64, name: &str, inventory: u64) -> Self {
        self.groups.lock().unwrap().push(Group {
            id,
            name: name.into(),
            inventory,
        });
        self
    }

    pub fn with_membership(self, host_id: u64, group_id: u64) -> Self {
        self.memberships.lock().unwrap().push((host_id, group_id));
        self
    }

    /// A host already in `inventory` and in that inventory's `facility` group.
    pub fn with_registered_host(self, id: u64, name: &str, inventory: u64, facility: &str) -> Self {
        let group_id = 500 + id;
        self.with_host(id, name, inventory)
            .with_group(group_id, facility, inventory)
            .with_membership(id, group_id)
    }

    pub fn push_summaries(&self, batch: Vec<HostSummary>) {
        self.queued_summaries.lock().unwrap().push_back(batch);
    }

    pub fn set_default_summaries(&self, batch: Vec<HostSummary>) {
        *self.default_summaries.lock().unwrap() = Some(batch);
    }

    pub fn finish_template(&self, template_id: u64, status: JobStatus) {
        self.template_status
            .lock()
            .unwrap()
            .insert(template_id, status);
    }

    pub fn fail_groups(&self, status: u16) {
        *self.groups_error.lock().unwrap() = Some(status);
    }

    pub fn fail_associate(&self, status: u16) {
        *self.associate_error.lock().unwrap() = Some(status);
    }

    pub fn fail_launch(&self, status: u16) {
        *self.launch_error.lock().unwrap() = Some(status);
    }

    pub fn fail_summaries(&self, status: u16) {
        *self.summaries_error.lock().unwrap() = Some(status);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn launches(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Launch(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn summary_queries(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Summaries(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl AutomationApi for FakeApi {
    async fn list_hosts(&self, name: &str) -> Result<Vec<Host>, AwxError> {
        self.record(Call::ListHosts(name.into()));
        Ok(self
            .hosts
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.name == name)
            .cloned()
            .collect())
    }

    async fn create_host(&self, host: &NewHost) -> Result<Host, AwxError> {
        self.record(Call::CreateHost(host.name.clone(), host.inventory));
        let mut hosts = self.hosts.lock().unwrap();
        let created = Host {
            id: 100 + hosts.len() as u64,
            name: host.name.clone(),
            inventory: host.inventory,
        };
        hosts.push(created.clone());
        Ok(created)
    }

    async fn list_groups(&self, name: &str) -> Result<Vec<Group>, AwxError> {
        self.record(Call::ListGroups(name.into()));
        if let Some(status) = *self.groups_error.lock().unwrap() {
            return Err(api_error(status));
        }
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.name == name)
            .cloned()
            .collect())
    }

    async fn host_groups(&self, host_id: u64) -> Result<Vec<Group>, AwxError> {
        self.record(Call::HostGroups(host_id));
        let memberships = self.memberships.lock().unwrap();
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| memberships.contains(&(host_id, g.id)))
            .cloned()
            .collect())
    }

    async fn associate_group(&self, host_id: u64, group_id: u64) -> Result<(), AwxError> {
        self.record(Call::Associate { host_id, group_id });
        if let Some(status) = *self.associate_error.lock().unwrap() {
            return Err(api_error(status));
        }
        self.memberships.lock().unwrap().push((host_id, group_id));
        Ok(())
    }

    async fn launch_template(
        &self,
        template_id: u64,
        _params: &Map<String, Value>,
    ) -> Result<LaunchedJob, AwxError> {
        self.record(Call::Launch(template_id));
        if let Some(status) = *self.launch_error.lock().unwrap() {
            return Err(api_error(status));
        }
        Ok(LaunchedJob {
            id: template_id + JOB_ID_OFFSET,
        })
    }

    async fn host_summaries(&self, job_id: u64) -> Result<Vec<HostSummary>, AwxError> {
        self.record(Call::Summaries(job_id));
        if let Some(status) = *self.summaries_error.lock().unwrap() {
            return Err(api_error(status));
        }
        if let Some(batch) = self.queued_summaries.lock().unwrap().pop_front() {
            return Ok(batch);
        }
        let template_id = job_id.saturating_sub(JOB_ID_OFFSET);
        if let Some(status) = self.template_status.lock().unwrap().get(&template_id) {
            return Ok(vec![summary(job_id, *status, false)]);
        }
        if let Some(batch) = self.default_summaries.lock().unwrap().clone() {
            return Ok(batch);
        }
        Ok(vec![summary(job_id, JobStatus::Successful, false)])
    }
}
