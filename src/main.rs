mod awx;
mod cli;
mod config;
mod context;
mod error;
mod host;
mod inventory;
mod launcher;
mod marker;
mod orchestrator;
mod poller;
mod relay;
mod state_machine;
#[cfg(test)]
mod testing;
mod ui;
mod vars;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use tracing::{Instrument, error, info_span, warn};
use tracing_subscriber::EnvFilter;

use awx::AwxClient;
use config::AppConfig;
use context::BuildContext;
use error::BuildError;
use host::{HostCleanup, SystemRunner};
use marker::FsMarkerStore;
use orchestrator::{BuildStatus, Orchestrator, Platform};
use poller::TokioSleeper;
use relay::RelayClient;
use ui::BuildProgress;
use vars::{Credentials, Distro, ForemanVars, VarsSource};

type AwxOrchestrator = Orchestrator<AwxClient, FsMarkerStore, TokioSleeper>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = matches!(cli.command, Command::Relay { debug: true, .. });
    init_tracing(cli.verbose || debug);

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Build {
            relay_port,
            mock,
            file,
        } => {
            let status = build(&config, relay_port, mock.as_deref(), file.as_deref()).await;
            if status.is_successful() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Relay { port, .. } => match run_relay(&config, port).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "awxclient=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn build(
    config: &AppConfig,
    relay_port: Option<u16>,
    mock: Option<&str>,
    file: Option<&str>,
) -> BuildStatus {
    let (ctx, relay_host) = match prepare(config, mock, file).await {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("{e}");
            return BuildStatus::Failed(e);
        }
    };
    let mock = mock.is_some();

    let orchestrator = match orchestrator_for(config, &ctx, relay_host, relay_port, mock) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("{e}");
            return BuildStatus::Failed(e);
        }
    };

    let progress = BuildProgress::start(&ctx, mock);
    let span = info_span!("build", fqdn = %ctx.fqdn, host_type = %ctx.host_type, mock);
    let status = orchestrator.run(&ctx, mock).instrument(span).await;
    progress.finish(&status);
    status
}

// Everything read from the host before any job is launched.
async fn prepare(
    config: &AppConfig,
    mock: Option<&str>,
    file: Option<&str>,
) -> Result<(BuildContext, Option<String>), BuildError> {
    let fqdn = match mock {
        Some(fqdn) => fqdn.to_string(),
        None => host::hostname()
            .map_err(|e| BuildError::configuration(format!("reading hostname: {e}")))?,
    };

    let foreman = ForemanVars::load(&config.env_files)?;
    let distro = Distro::detect(&config.rocky_release_path);
    let source = VarsSource::resolve(file, &foreman, distro, &config.vars_path);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| BuildError::transport(format!("building HTTP client: {e}")))?;
    let awx_vars = source.fetch(&http).await?;

    if mock.is_none() {
        if let Err(e) = host::persist_journal(&config.journald_path) {
            warn!(
                "could not make the journal persistent ({}): {e}",
                config.journald_path.display()
            );
        }
    }

    let ctx = vars::build_context(&fqdn, &foreman, awx_vars);
    Ok((ctx, foreman.relay))
}

fn orchestrator_for(
    config: &AppConfig,
    ctx: &BuildContext,
    relay_host: Option<String>,
    relay_port: Option<u16>,
    mock: bool,
) -> Result<AwxOrchestrator, BuildError> {
    let cleanup = HostCleanup::new(
        config.credentials_path.clone(),
        config.systemd_wants_dir.clone(),
        SystemRunner,
    );
    let mut orchestrator: AwxOrchestrator =
        Orchestrator::default().with_post_build(Box::new(cleanup));

    if ctx.host_type.runs_locally() {
        // Mock builds never reach AWX, so they don't need credentials.
        if !mock {
            orchestrator = orchestrator.with_platform(platform(config)?);
        }
    } else if let Some(host) = relay_host {
        let port = relay_port.unwrap_or(config.relay_port);
        orchestrator =
            orchestrator.with_relay(RelayClient::new(&host, port, config.relay_timeout())?);
    }
    Ok(orchestrator)
}

fn platform(
    config: &AppConfig,
) -> Result<Platform<AwxClient, FsMarkerStore, TokioSleeper>, BuildError> {
    let credentials = Credentials::load(&config.credentials_path)?;
    let api = AwxClient::new(
        &config.awx_url,
        credentials.username,
        credentials.password,
        config.accept_invalid_certs,
    )?;
    Ok(Platform {
        api,
        markers: FsMarkerStore::new(config.marker_dir.clone()),
        sleeper: TokioSleeper,
        rules: config.inventories.clone(),
        timings: config.poll,
    })
}

async fn run_relay(config: &AppConfig, port: Option<u16>) -> Result<()> {
    let orchestrator: AwxOrchestrator =
        Orchestrator::default().with_platform(platform(config).context("setting up AWX client")?);
    let app = relay::router(Arc::new(orchestrator));
    relay::serve(app, port.unwrap_or(config.relay_port))
        .await
        .context("running relay server")
}
