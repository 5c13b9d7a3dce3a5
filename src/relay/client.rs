use std::time::Duration;

use reqwest::Client;
use tracing::info;

use super::wire::{BuildRequest, kind_for_status};
use crate::context::BuildContext;
use crate::error::{BuildError, ErrorKind};

const RELAY_TROUBLE: &str =
    "There is an issue with the AWX relay, please reach out to Platform Engineering.";

/// Hands a build to the relay and waits for its verdict.
pub struct RelayClient {
    client: Client,
    url: String,
}

impl RelayClient {
    /// `http://<host>:<port>/build/`.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, BuildError> {
        Self::with_url(format!("http://{host}:{port}/build/"), timeout)
    }

    /// Point at an explicit URL (useful for testing).
    pub fn with_url(url: String, timeout: Duration) -> Result<Self, BuildError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| BuildError::transport(format!("building relay client: {e}")))?;
        Ok(Self { client, url })
    }

    pub async fn submit(&self, ctx: &BuildContext, mock: bool) -> Result<(), BuildError> {
        info!("Sending collected data to the AWX relay at {}...", self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&BuildRequest::new(ctx, mock))
            .send()
            .await
            .map_err(|e| BuildError::transport(format!("contacting relay: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BuildError::transport(format!("reading relay response: {e}")))?;

        if status == 200 {
            let verdict = body.trim().trim_matches('"');
            return if verdict == "successful" {
                Ok(())
            } else {
                Err(BuildError::transport(format!("unknown job status {verdict}")))
            };
        }

        Err(decode_failure(status, &body))
    }
}

// The status code decides the kind; the body only adds detail when it agrees.
fn decode_failure(status: u16, body: &str) -> BuildError {
    let kind = kind_for_status(status);
    if let Ok(err) = serde_json::from_str::<BuildError>(body) {
        if err.kind() == kind {
            return err;
        }
    }

    let detail = body.trim().trim_matches('"');
    match kind {
        ErrorKind::AccessDenied => BuildError::access_denied(format!(
            "{RELAY_TROUBLE} Ensure the correct credentials are on the relay and the Foreman user has access in AWX"
        )),
        ErrorKind::Configuration => {
            BuildError::configuration(format!("{RELAY_TROUBLE} {detail}"))
        }
        _ => BuildError::transport(format!(
            "{RELAY_TROUBLE} relay answered {status} ({kind}): {detail}"
        )),
    }
}
