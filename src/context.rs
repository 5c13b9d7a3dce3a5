//! The per-run build context shared by every stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Where the host sits in the network, which decides who can reach AWX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostType {
    Internal,
    Midtier,
    Edge,
}

impl HostType {
    /// Internal hosts talk to AWX themselves; the rest go through the relay.
    pub fn runs_locally(self) -> bool {
        matches!(self, HostType::Internal)
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Internal => write!(f, "internal"),
            HostType::Midtier => write!(f, "midtier"),
            HostType::Edge => write!(f, "edge"),
        }
    }
}

impl FromStr for HostType {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal" => Ok(HostType::Internal),
            "midtier" => Ok(HostType::Midtier),
            "edge" => Ok(HostType::Edge),
            other => Err(BuildError::configuration(format!(
                "unknown host type '{other}', expected internal, midtier or edge"
            ))),
        }
    }
}

/// A job template reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: u64,
    pub name: String,
}

/// Everything both jobs need. Built once per run and only ever borrowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    pub fqdn: String,
    pub breakglass: Template,
    pub baseline: Template,
    pub inventory_id: u64,
    pub inventory_name: String,
    /// `<osmajor>.<osminor>`, e.g. `8.6`.
    pub desired_release: String,
    pub reboot: bool,
    pub host_type: HostType,
    pub facility: String,
}

#[cfg(test)]
pub(crate) fn sample_context(host_type: HostType) -> BuildContext {
    BuildContext {
        fqdn: "web01.dc1.example.com".into(),
        breakglass: Template {
            id: 15,
            name: "Breakglass".into(),
        },
        baseline: Template {
            id: 16,
            name: "Baseline Apply".into(),
        },
        inventory_id: 44,
        inventory_name: "Foreman_Hosts".into(),
        desired_release: "7.9".into(),
        reboot: true,
        host_type,
        facility: "dc1".into(),
    }
}
