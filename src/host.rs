//! Changes made to the provisioned host itself, before and after a build.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::orchestrator::PostBuild;

/// Name of this host as the kernel knows it.
pub fn hostname() -> io::Result<String> {
    let name = std::fs::read_to_string("/proc/sys/kernel/hostname")?;
    Ok(name.trim().to_string())
}

/// Make the systemd journal survive the reboot that ends a build, so the
/// outcome can still be read afterwards.
pub fn persist_journal(path: &Path) -> io::Result<()> {
    let original = std::fs::read_to_string(path)?;
    let rewritten = persist_journal_config(&original);
    if rewritten != original {
        std::fs::write(path, rewritten)?;
        info!("Enabled persistent journal in {}", path.display());
    }
    Ok(())
}

fn persist_journal_config(conf: &str) -> String {
    let mut out: Vec<&str> = conf
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("#Storage=") {
                "Storage=persistent"
            } else if trimmed.starts_with("#SystemMaxUse=") {
                "SystemMaxUse=500M"
            } else {
                line
            }
        })
        .collect();
    if conf.ends_with('\n') {
        out.push("");
    }
    out.join("\n")
}

/// Runs external commands. Split out so cleanup can be tested without root.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<()>;
}

pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<()> {
        debug!("running {program} {}", args.join(" "));
        let output = Command::new(program).args(args).output()?;
        if output.status.success() {
            return Ok(());
        }
        Err(io::Error::other(format!(
            "{program} {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// Removes every trace of the client once both jobs have succeeded.
pub struct HostCleanup<R> {
    credentials_path: PathBuf,
    units_dir: PathBuf,
    runner: R,
}

impl<R: CommandRunner> HostCleanup<R> {
    pub fn new(credentials_path: PathBuf, units_dir: PathBuf, runner: R) -> Self {
        Self {
            credentials_path,
            units_dir,
            runner,
        }
    }

    // First `awxclient*` entry by name.
    fn enabled_unit(&self) -> Result<PathBuf, BuildError> {
        let entries = std::fs::read_dir(&self.units_dir).map_err(|e| {
            BuildError::cleanup(format!("listing {}: {e}", self.units_dir.display()))
        })?;
        let mut units: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("awxclient"))
            .map(|e| e.path())
            .collect();
        units.sort();
        units
            .into_iter()
            .next()
            .ok_or_else(|| BuildError::cleanup("can't find the awxclient systemd unit"))
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<(), BuildError> {
        self.runner
            .run(program, args)
            .map_err(|e| BuildError::cleanup(e.to_string()))
    }
}

impl<R: CommandRunner> PostBuild for HostCleanup<R> {
    fn clean_up(&self, ctx: &BuildContext) -> Result<(), BuildError> {
        info!("Cleaning up...");

        match std::fs::remove_file(&self.credentials_path) {
            Ok(()) => debug!("removed {}", self.credentials_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BuildError::cleanup(format!(
                    "removing {}: {e}",
                    self.credentials_path.display()
                )));
            }
        }

        // Otherwise the unit would launch the jobs again after the reboot.
        let unit = self.enabled_unit()?;
        self.run("systemctl", &["disable", &unit.to_string_lossy()])?;
        self.run("/usr/bin/yum", &["-y", "remove", "awxclient"])?;

        if ctx.reboot {
            info!("Build completed successfully. Rebooting in 60 seconds.");
            self.run("shutdown", &["-r", "+1"])?;
        } else {
            info!("Build completed successfully. Please manually reboot.");
        }
        Ok(())
    }
}
