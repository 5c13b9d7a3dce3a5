//! Interface de terminal do awxclient: spinner e veredito colorido.
//!
//! Usa `indicatif` para o spinner e `console` para as cores. Quando a saída
//! não é um terminal (por exemplo, sob systemd) o spinner fica oculto e só o
//! veredito é impresso.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::context::BuildContext;
use crate::orchestrator::BuildStatus;

/// Indicador visual de um build em andamento.
pub struct BuildProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl BuildProgress {
    /// Inicia o spinner com o FQDN e o tipo do host.
    pub fn start(ctx: &BuildContext, mock: bool) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        let mode = if mock { " (mock)" } else { "" };
        pb.set_message(format!(
            "Building {} ({} host){mode}: {} then {}",
            ctx.fqdn, ctx.host_type, ctx.breakglass.name, ctx.baseline.name
        ));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Finaliza o spinner e imprime o resultado final.
    pub fn finish(&self, status: &BuildStatus) {
        self.pb.finish_and_clear();
        match status {
            BuildStatus::Successful => {
                println!("  {} Build completed successfully", self.green.apply_to("✓"));
            }
            BuildStatus::Failed(err) => {
                println!("  {} Build failed ({}): {err}", self.red.apply_to("✗"), err.kind());
            }
        }
    }
}
