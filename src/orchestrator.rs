use tracing::{error, info};

use crate::awx::AutomationApi;
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::inventory::{GroupRules, InventoryRegistrar};
use crate::launcher::JobLauncher;
use crate::marker::MarkerStore;
use crate::poller::Sleeper;
use crate::relay::RelayClient;
use crate::state_machine::{JobSpec, PollTimings};

/// Verdict of a whole build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    Successful,
    Failed(BuildError),
}

impl BuildStatus {
    pub fn is_successful(&self) -> bool {
        matches!(self, BuildStatus::Successful)
    }
}

impl From<Result<(), BuildError>> for BuildStatus {
    fn from(result: Result<(), BuildError>) -> Self {
        match result {
            Ok(()) => BuildStatus::Successful,
            Err(e) => BuildStatus::Failed(e),
        }
    }
}

/// Host-side work that only happens after a real (non-mock) success.
pub trait PostBuild: Send + Sync {
    fn clean_up(&self, ctx: &BuildContext) -> Result<(), BuildError>;
}

/// What a local build needs to talk to AWX.
pub struct Platform<A, M, S> {
    pub api: A,
    pub markers: M,
    pub sleeper: S,
    pub rules: GroupRules,
    pub timings: PollTimings,
}

/// Runs breakglass then baseline, here or through the relay.
pub struct Orchestrator<A, M, S> {
    platform: Option<Platform<A, M, S>>,
    relay: Option<RelayClient>,
    post_build: Option<Box<dyn PostBuild>>,
}

impl<A, M, S> Default for Orchestrator<A, M, S> {
    fn default() -> Self {
        Self {
            platform: None,
            relay: None,
            post_build: None,
        }
    }
}

impl<A: AutomationApi, M: MarkerStore, S: Sleeper> Orchestrator<A, M, S> {
    pub fn with_platform(mut self, platform: Platform<A, M, S>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_relay(mut self, relay: RelayClient) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_post_build(mut self, hook: Box<dyn PostBuild>) -> Self {
        self.post_build = Some(hook);
        self
    }

    /// Full build for `ctx`. Internal hosts launch jobs themselves; midtier and
    /// edge hosts delegate to the relay. Cleanup runs only after a real success.
    pub async fn run(&self, ctx: &BuildContext, mock: bool) -> BuildStatus {
        let status = if ctx.host_type.runs_locally() {
            self.run_local(ctx, mock).await
        } else {
            self.delegate(ctx, mock).await
        };

        if !status.is_successful() || mock {
            return status;
        }
        match &self.post_build {
            Some(hook) => hook.clean_up(ctx).into(),
            None => status,
        }
    }

    /// Register the host and launch both jobs against AWX from this process,
    /// whatever the host type. This is what the relay runs for each request.
    pub async fn run_local(&self, ctx: &BuildContext, mock: bool) -> BuildStatus {
        if mock {
            info!("Mock build for {}: skipping inventory and job launches", ctx.fqdn);
            info!("Kicking off {}...", ctx.breakglass.name);
            info!("Kicking off {}...", ctx.baseline.name);
            return BuildStatus::Successful;
        }

        let Some(platform) = &self.platform else {
            return BuildStatus::Failed(BuildError::configuration(
                "no AWX client is configured on this host",
            ));
        };

        let status: BuildStatus = launch_all(platform, ctx).await.into();
        if let BuildStatus::Failed(e) = &status {
            error!("build of {} stopped: {e}", ctx.fqdn);
        }
        status
    }

    async fn delegate(&self, ctx: &BuildContext, mock: bool) -> BuildStatus {
        let Some(relay) = &self.relay else {
            return BuildStatus::Failed(BuildError::configuration(format!(
                "{} is a {} host but no relay is configured (mtrelay missing from the environment file)",
                ctx.fqdn, ctx.host_type
            )));
        };
        relay.submit(ctx, mock).await.into()
    }
}

// Baseline is only ever launched after breakglass succeeded.
async fn launch_all<A: AutomationApi, M: MarkerStore, S: Sleeper>(
    platform: &Platform<A, M, S>,
    ctx: &BuildContext,
) -> Result<(), BuildError> {
    InventoryRegistrar::new(&platform.api, &platform.rules)
        .ensure(ctx)
        .await?;

    let launcher = JobLauncher::new(
        &platform.api,
        &platform.markers,
        &platform.sleeper,
        platform.timings,
    );
    launcher
        .launch(&JobSpec::breakglass(ctx))
        .await
        .into_result()?;
    launcher
        .launch(&JobSpec::baseline(ctx))
        .await
        .into_result()?;

    info!(
        "{} and {} were executed successfully",
        ctx.breakglass.name, ctx.baseline.name
    );
    Ok(())
}
