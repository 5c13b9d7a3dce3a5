use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::awx::{AutomationApi, AwxError, Host, NewHost};
use crate::context::{BuildContext, HostType};
use crate::error::BuildError;

/// One row of the inventory lookup table: which builds belong in `inventory_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRule {
    pub inventory_id: u64,
    /// Human name of the inventory, used in log lines.
    pub label: String,
    pub host_type: HostType,
    /// OS release prefix (e.g. `8.`). Absent means any release.
    #[serde(default)]
    pub release_prefix: Option<String>,
}

impl InventoryRule {
    fn applies(&self, inventory_id: u64, ctx: &BuildContext) -> bool {
        self.inventory_id == inventory_id
            && self.host_type == ctx.host_type
            && self
                .release_prefix
                .as_deref()
                .is_none_or(|prefix| ctx.desired_release.starts_with(prefix))
    }
}

/// Inventory id → group-resolution rule, loaded from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupRules {
    rules: Vec<InventoryRule>,
}

impl Default for GroupRules {
    fn default() -> Self {
        let rule = |inventory_id, label: &str, host_type, prefix: Option<&str>| InventoryRule {
            inventory_id,
            label: label.to_string(),
            host_type,
            release_prefix: prefix.map(str::to_string),
        };
        Self {
            rules: vec![
                rule(44, "Foreman_Hosts", HostType::Internal, Some("7.")),
                rule(392, "Rocky Foreman", HostType::Internal, Some("8.")),
                rule(513, "Midtier-Baremetal", HostType::Midtier, None),
                rule(516, "Edge-Baremetal", HostType::Edge, None),
            ],
        }
    }
}

impl GroupRules {
    /// Label of `inventory_id` if a build described by `ctx` belongs there.
    pub fn label_for(&self, inventory_id: u64, ctx: &BuildContext) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.applies(inventory_id, ctx))
            .map(|r| r.label.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Inventory or group does not line up with the build. Not retried.
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Transport(#[from] AwxError),
}

impl From<RegistrationError> for BuildError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Configuration(message) => BuildError::Configuration { message },
            RegistrationError::Transport(e) => BuildError::from(e),
        }
    }
}

/// Makes sure the host is in the right inventory and facility group.
pub struct InventoryRegistrar<'a, A> {
    api: &'a A,
    rules: &'a GroupRules,
}

impl<'a, A: AutomationApi> InventoryRegistrar<'a, A> {
    pub fn new(api: &'a A, rules: &'a GroupRules) -> Self {
        Self { api, rules }
    }

    pub async fn ensure(&self, ctx: &BuildContext) -> Result<(), RegistrationError> {
        let hosts = self.api.list_hosts(&ctx.fqdn).await?;
        let registered: Vec<&Host> = hosts.iter().filter(|h| h.name == ctx.fqdn).collect();

        if !registered.is_empty() {
            let (host, label) = self.fitting(ctx, &registered)?;
            return self.confirm_membership(ctx, host, label).await;
        }

        info!("Couldn't find {} in any inventory", ctx.fqdn);
        info!("Attempting to create it...");
        self.create(ctx).await
    }

    // A host may sit in several inventories; exactly one must fit this build.
    fn fitting<'h>(
        &self,
        ctx: &BuildContext,
        registered: &[&'h Host],
    ) -> Result<(&'h Host, &str), RegistrationError> {
        let fitting: Vec<(&Host, &str)> = registered
            .iter()
            .filter_map(|h| self.rules.label_for(h.inventory, ctx).map(|label| (*h, label)))
            .collect();

        match fitting.as_slice() {
            [one] => Ok(*one),
            [] => {
                let ids: Vec<String> = registered.iter().map(|h| h.inventory.to_string()).collect();
                Err(RegistrationError::Configuration(format!(
                    "{} is registered in inventory {} but none fits a {} build of release {}; move it to {}",
                    ctx.fqdn,
                    ids.join(", "),
                    ctx.host_type,
                    ctx.desired_release,
                    ctx.inventory_name
                )))
            }
            many => {
                let labels: Vec<&str> = many.iter().map(|(_, label)| *label).collect();
                Err(RegistrationError::Configuration(format!(
                    "{} is registered in more than one inventory fitting this build ({})",
                    ctx.fqdn,
                    labels.join(", ")
                )))
            }
        }
    }

    // Read-only: a registered host outside its facility group is reported, never fixed up.
    async fn confirm_membership(
        &self,
        ctx: &BuildContext,
        host: &Host,
        label: &str,
    ) -> Result<(), RegistrationError> {
        let groups = self.api.host_groups(host.id).await?;
        let member = groups
            .iter()
            .any(|g| g.name == ctx.facility && g.inventory == host.inventory);
        if !member {
            return Err(RegistrationError::Configuration(format!(
                "{} is in inventory {label} but not in its {} group; add it to the group in AWX",
                ctx.fqdn, ctx.facility
            )));
        }
        info!("Found {} in inventory {label}, group {}", ctx.fqdn, ctx.facility);
        Ok(())
    }

    // The group is resolved before the host is created, so a missing group
    // leaves nothing behind in AWX.
    async fn create(&self, ctx: &BuildContext) -> Result<(), RegistrationError> {
        if self.rules.label_for(ctx.inventory_id, ctx).is_none() {
            return Err(RegistrationError::Configuration(format!(
                "inventory {} ({}) is not configured for {} hosts running release {}",
                ctx.inventory_id, ctx.inventory_name, ctx.host_type, ctx.desired_release
            )));
        }

        let missing_group = || {
            RegistrationError::Configuration(format!(
                "Ensure {} group exists in the {} inventory",
                ctx.facility, ctx.inventory_name
            ))
        };
        let classify = |e: AwxError| {
            if e.is_client_error() {
                missing_group()
            } else {
                RegistrationError::Transport(e)
            }
        };

        let groups = self.api.list_groups(&ctx.facility).await.map_err(classify)?;
        // First match in response order wins.
        let group = groups
            .iter()
            .find(|g| g.inventory == ctx.inventory_id)
            .ok_or_else(missing_group)?;

        let host = self
            .api
            .create_host(&NewHost::built_by_foreman(&ctx.fqdn, ctx.inventory_id))
            .await?;

        self.api
            .associate_group(host.id, group.id)
            .await
            .map_err(classify)?;

        info!(
            "Successfully created {} and added it to the {} group in {}",
            ctx.fqdn, group.name, ctx.inventory_name
        );
        Ok(())
    }
}
