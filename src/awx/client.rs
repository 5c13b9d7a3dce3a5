use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::error::AwxError;
use super::types::{Group, Host, HostSummary, LaunchedJob, NewHost, Page};

const PAGE_SIZE: &str = "200";

/// The slice of the AWX API the build flow consumes.
///
/// Futures are `Send` so the relay can drive builds from axum handlers.
pub trait AutomationApi: Send + Sync {
    fn list_hosts(&self, name: &str) -> impl Future<Output = Result<Vec<Host>, AwxError>> + Send;

    fn create_host(&self, host: &NewHost) -> impl Future<Output = Result<Host, AwxError>> + Send;

    fn list_groups(&self, name: &str)
    -> impl Future<Output = Result<Vec<Group>, AwxError>> + Send;

    /// Groups `host_id` already belongs to.
    fn host_groups(&self, host_id: u64)
    -> impl Future<Output = Result<Vec<Group>, AwxError>> + Send;

    fn associate_group(
        &self,
        host_id: u64,
        group_id: u64,
    ) -> impl Future<Output = Result<(), AwxError>> + Send;

    fn launch_template(
        &self,
        template_id: u64,
        params: &Map<String, Value>,
    ) -> impl Future<Output = Result<LaunchedJob, AwxError>> + Send;

    fn host_summaries(
        &self,
        job_id: u64,
    ) -> impl Future<Output = Result<Vec<HostSummary>, AwxError>> + Send;
}

/// AWX REST v2 client using HTTP basic auth.
pub struct AwxClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl AwxClient {
    /// Build a client for `base_url` (e.g. `https://awx.internaldomain.co`).
    ///
    /// `accept_invalid_certs` disables TLS verification; the platform serves an
    /// internally signed certificate.
    pub fn new(
        base_url: &str,
        username: String,
        password: String,
        accept_invalid_certs: bool,
    ) -> Result<Self, AwxError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.base_url, path)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, AwxError> {
        let response = self
            .client
            .get(self.url(path))
            .basic_auth(&self.username, Some(&self.password))
            .query(query)
            .query(&[("page_size", PAGE_SIZE)])
            .send()
            .await?;
        let page = check(response).await?.json::<Page<T>>().await?;
        debug!("{path}: {} of {} results", page.results.len(), page.count);
        Ok(page.results)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, AwxError> {
        let response = self
            .client
            .post(self.url(path))
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;
        check(response).await
    }
}

async fn check(response: Response) -> Result<Response, AwxError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(AwxError::Api {
        status: status.as_u16(),
        message,
    })
}

impl AutomationApi for AwxClient {
    async fn list_hosts(&self, name: &str) -> Result<Vec<Host>, AwxError> {
        self.list("hosts/", &[("name", name)]).await
    }

    async fn create_host(&self, host: &NewHost) -> Result<Host, AwxError> {
        let response = self.post("hosts/", host).await?;
        Ok(response.json::<Host>().await?)
    }

    async fn list_groups(&self, name: &str) -> Result<Vec<Group>, AwxError> {
        self.list("groups/", &[("name", name)]).await
    }

    async fn host_groups(&self, host_id: u64) -> Result<Vec<Group>, AwxError> {
        self.list(&format!("hosts/{host_id}/groups/"), &[]).await
    }

    async fn associate_group(&self, host_id: u64, group_id: u64) -> Result<(), AwxError> {
        let body = json!({ "id": group_id, "associate": true });
        self.post(&format!("hosts/{host_id}/groups/"), &body).await?;
        Ok(())
    }

    async fn launch_template(
        &self,
        template_id: u64,
        params: &Map<String, Value>,
    ) -> Result<LaunchedJob, AwxError> {
        let response = self
            .post(&format!("job_templates/{template_id}/launch/"), params)
            .await?;
        Ok(response.json::<LaunchedJob>().await?)
    }

    async fn host_summaries(&self, job_id: u64) -> Result<Vec<HostSummary>, AwxError> {
        self.list(&format!("jobs/{job_id}/job_host_summaries/"), &[])
            .await
    }
}
