//! Inputs a freshly provisioned host finds on disk or on its build server:
//! the environment file Foreman leaves in `/etc`, the AWX vars JSON and the
//! AWX credentials.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::context::{BuildContext, HostType, Template};
use crate::error::BuildError;

/// Parse `KEY=VALUE` lines. Keys are lower-cased; lines with an empty side are
/// ignored, and so is everything after a second `=`.
pub fn parse_env(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.trim().split_once('=')?;
            let value = rest.split('=').next().unwrap_or_default().trim();
            let key = key.trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, std::io::Error> {
    Ok(parse_env(&std::fs::read_to_string(path)?))
}

/// Values Foreman wrote for this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForemanVars {
    pub build_server: String,
    pub facility: String,
    pub host_type: HostType,
    pub build_ip: String,
    pub os_major: String,
    pub os_minor: String,
    /// Relay host for midtier and edge builds.
    pub relay: Option<String>,
}

impl ForemanVars {
    /// Read the last of `candidates` that exists.
    pub fn load(candidates: &[PathBuf]) -> Result<Self, BuildError> {
        let path = candidates.iter().rev().find(|p| p.exists()).ok_or_else(|| {
            BuildError::configuration(
                "can't find environment file containing Foreman variables",
            )
        })?;
        info!("Reading Foreman variables from {}", path.display());

        let map = read_env_file(path).map_err(|e| {
            BuildError::configuration(format!("reading {}: {e}", path.display()))
        })?;
        let vars = Self::from_map(&map, path)?;
        debug!(
            "{} host in {}, release {}, build IP {}",
            vars.host_type,
            vars.facility,
            vars.desired_release(),
            vars.build_ip
        );
        Ok(vars)
    }

    fn from_map(vars: &HashMap<String, String>, origin: &Path) -> Result<Self, BuildError> {
        let required = |key: &str| {
            vars.get(key).cloned().ok_or_else(|| {
                BuildError::configuration(format!(
                    "{key} key is empty. Ensure {} contains the correct data",
                    origin.display()
                ))
            })
        };

        Ok(Self {
            build_server: required("build_server")?,
            facility: required("facility")?,
            host_type: required("type")?.parse()?,
            build_ip: required("buildip")?,
            os_major: required("osmajor")?,
            os_minor: required("osminor")?,
            relay: vars.get("mtrelay").cloned(),
        })
    }

    pub fn desired_release(&self) -> String {
        format!("{}.{}", self.os_major, self.os_minor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    Centos,
    Rocky,
}

impl Distro {
    pub fn detect(rocky_release: &Path) -> Self {
        if rocky_release.exists() {
            Distro::Rocky
        } else {
            Distro::Centos
        }
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distro::Centos => write!(f, "centos"),
            Distro::Rocky => write!(f, "rocky"),
        }
    }
}

/// Template and inventory selection published per distro and host type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AwxVars {
    #[serde(rename = "baselinename")]
    pub baseline_name: String,
    #[serde(rename = "baselineid")]
    pub baseline_id: u64,
    #[serde(rename = "breakglassname")]
    pub breakglass_name: String,
    #[serde(rename = "breakglassid")]
    pub breakglass_id: u64,
    #[serde(rename = "inventoryname")]
    pub inventory_name: String,
    #[serde(rename = "inventoryid")]
    pub inventory_id: u64,
    #[serde(default)]
    pub reboot: String,
}

/// Where the AWX vars JSON comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarsSource {
    Url(String),
    File(PathBuf),
}

impl VarsSource {
    /// An explicit `--file` wins: URLs are fetched, anything else is read from
    /// disk. Without one, `<build_server><vars_path><distro>-<type>.json`.
    pub fn resolve(
        file: Option<&str>,
        foreman: &ForemanVars,
        distro: Distro,
        vars_path: &str,
    ) -> Self {
        match file {
            Some(f) if f.starts_with("http://") || f.starts_with("https://") => {
                VarsSource::Url(f.to_string())
            }
            Some(f) if !f.is_empty() => VarsSource::File(PathBuf::from(f)),
            _ => VarsSource::Url(format!(
                "{}{vars_path}{distro}-{}.json",
                foreman.build_server, foreman.host_type
            )),
        }
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> Result<AwxVars, BuildError> {
        let body = match self {
            VarsSource::Url(url) => {
                debug!("fetching AWX vars from {url}");
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| BuildError::transport(format!("fetching {url}: {e}")))?;
                match response.status() {
                    StatusCode::OK => {}
                    StatusCode::NOT_FOUND => {
                        return Err(BuildError::configuration(format!("404: can't find {url}")));
                    }
                    other => {
                        return Err(BuildError::transport(format!("fetching {url}: {other}")));
                    }
                }
                response
                    .text()
                    .await
                    .map_err(|e| BuildError::transport(format!("reading {url}: {e}")))?
            }
            VarsSource::File(path) => std::fs::read_to_string(path).map_err(|e| {
                BuildError::configuration(format!("reading {}: {e}", path.display()))
            })?,
        };

        serde_json::from_str(&body)
            .map_err(|e| BuildError::configuration(format!("malformed AWX vars in {self}: {e}")))
    }
}

impl fmt::Display for VarsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarsSource::Url(url) => write!(f, "{url}"),
            VarsSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// AWX login written by Foreman as `user=` and `pass=` lines.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let vars = read_env_file(path).map_err(|e| {
            BuildError::access_denied(format!(
                "reading AWX credentials from {}: {e}",
                path.display()
            ))
        })?;
        let field = |key: &str| {
            vars.get(key).cloned().ok_or_else(|| {
                BuildError::access_denied(format!("{} has no {key} entry", path.display()))
            })
        };
        Ok(Self {
            username: field("user")?,
            password: field("pass")?,
        })
    }
}

/// Everything both jobs need, from the host's own view of itself.
pub fn build_context(fqdn: &str, foreman: &ForemanVars, awx: AwxVars) -> BuildContext {
    BuildContext {
        fqdn: fqdn.to_string(),
        breakglass: Template {
            id: awx.breakglass_id,
            name: awx.breakglass_name,
        },
        baseline: Template {
            id: awx.baseline_id,
            name: awx.baseline_name,
        },
        inventory_id: awx.inventory_id,
        inventory_name: awx.inventory_name,
        desired_release: foreman.desired_release(),
        reboot: awx.reboot.trim().eq_ignore_ascii_case("true"),
        host_type: foreman.host_type,
        facility: foreman.facility.clone(),
    }
}
