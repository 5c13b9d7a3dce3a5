//! JSON body exchanged between a delegating host and the relay.

use serde::{Deserialize, Serialize};

use crate::context::{BuildContext, HostType, Template};
use crate::error::ErrorKind;

/// Body of `POST /build/`. Key names are fixed by hosts already in the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub fqdn: String,
    #[serde(rename = "breakglassid")]
    pub breakglass_id: u64,
    #[serde(rename = "breakglassname")]
    pub breakglass_name: String,
    #[serde(rename = "baselineid")]
    pub baseline_id: u64,
    #[serde(rename = "baselinename")]
    pub baseline_name: String,
    #[serde(rename = "invid")]
    pub inventory_id: u64,
    #[serde(rename = "invname")]
    pub inventory_name: String,
    #[serde(rename = "desiredrelease", default)]
    pub desired_release: String,
    /// `"true"` or `"false"`.
    #[serde(default)]
    pub reboot: String,
    #[serde(rename = "type")]
    pub host_type: HostType,
    #[serde(default)]
    pub facility: String,
    /// Non-empty means mock; by convention it carries the mocked FQDN.
    #[serde(default)]
    pub mock: String,
}

impl BuildRequest {
    pub fn new(ctx: &BuildContext, mock: bool) -> Self {
        Self {
            fqdn: ctx.fqdn.clone(),
            breakglass_id: ctx.breakglass.id,
            breakglass_name: ctx.breakglass.name.clone(),
            baseline_id: ctx.baseline.id,
            baseline_name: ctx.baseline.name.clone(),
            inventory_id: ctx.inventory_id,
            inventory_name: ctx.inventory_name.clone(),
            desired_release: ctx.desired_release.clone(),
            reboot: ctx.reboot.to_string(),
            host_type: ctx.host_type,
            facility: ctx.facility.clone(),
            mock: if mock { ctx.fqdn.clone() } else { String::new() },
        }
    }

    pub fn is_mock(&self) -> bool {
        !self.mock.is_empty()
    }

    pub fn into_context(self) -> BuildContext {
        BuildContext {
            fqdn: self.fqdn,
            breakglass: Template {
                id: self.breakglass_id,
                name: self.breakglass_name,
            },
            baseline: Template {
                id: self.baseline_id,
                name: self.baseline_name,
            },
            inventory_id: self.inventory_id,
            inventory_name: self.inventory_name,
            desired_release: self.desired_release,
            reboot: self.reboot.trim().eq_ignore_ascii_case("true"),
            host_type: self.host_type,
            facility: self.facility,
        }
    }
}

/// HTTP status the relay answers with for each failure kind.
pub fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::AccessDenied => 401,
        ErrorKind::Configuration | ErrorKind::Cleanup => 500,
        ErrorKind::JobFailure => 502,
        ErrorKind::Transport => 503,
        ErrorKind::Timeout => 504,
    }
}

/// Inverse of [`status_for`] as seen by the delegating host.
pub fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::AccessDenied,
        400 | 422 | 500 => ErrorKind::Configuration,
        502 => ErrorKind::JobFailure,
        504 => ErrorKind::Timeout,
        _ => ErrorKind::Transport,
    }
}
