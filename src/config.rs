//! Configuração do awxclient carregada a partir de um arquivo TOML.
//!
//! A struct [`AppConfig`] contém todos os parâmetros configuráveis.
//! O caminho vem de `AWXCLIENT_CONFIG` (padrão `/etc/awxclient/awxclient.toml`);
//! valores ausentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `AWX_URL` tem precedência sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::inventory::GroupRules;
use crate::state_machine::PollTimings;

const DEFAULT_CONFIG_PATH: &str = "/etc/awxclient/awxclient.toml";

/// Configuração de nível superior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// URL base do AWX, sem `/api/v2`.
    pub awx_url: String,

    /// O AWX interno usa um certificado que não valida.
    pub accept_invalid_certs: bool,

    /// Arquivo com `user=`/`pass=` deixado pelo Foreman.
    pub credentials_path: PathBuf,

    /// Diretório dos marcadores `<host>-<template>.success`.
    pub marker_dir: PathBuf,

    /// Arquivos de ambiente do Foreman; o último existente vence.
    pub env_files: Vec<PathBuf>,

    /// Presença deste arquivo indica Rocky Linux.
    pub rocky_release_path: PathBuf,

    pub journald_path: PathBuf,

    /// Diretório das units habilitadas, onde fica a unit `awxclient*`.
    pub systemd_wants_dir: PathBuf,

    /// Caminho dos JSONs de vars do AWX relativo ao build server.
    pub vars_path: String,

    /// Porta do relay, tanto para servir quanto para delegar.
    pub relay_port: u16,

    /// Tempo máximo de espera por uma resposta do relay.
    pub relay_timeout_secs: u64,

    pub poll: PollTimings,

    /// Tabela inventário → regra de grupo.
    pub inventories: GroupRules,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            awx_url: "https://awx.internaldomain.co".to_string(),
            accept_invalid_certs: true,
            credentials_path: PathBuf::from("/var/tmp/.tower_creds"),
            marker_dir: PathBuf::from("/var/tmp"),
            env_files: vec![PathBuf::from("/etc/dss.env"), PathBuf::from("/etc/bam.env")],
            rocky_release_path: PathBuf::from("/etc/rocky-release"),
            journald_path: PathBuf::from("/etc/systemd/journald.conf"),
            systemd_wants_dir: PathBuf::from("/etc/systemd/system/multi-user.target.wants"),
            vars_path: "awxclient-dev/awxvars/".to_string(),
            relay_port: 8080,
            // Um build delegado inclui os dois jobs inteiros no relay.
            relay_timeout_secs: 2 * 60 * 60,
            poll: PollTimings::default(),
            inventories: GroupRules::default(),
        }
    }
}

impl AppConfig {
    /// Carrega a configuração do caminho em `AWXCLIENT_CONFIG` ou do padrão.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let path = std::env::var("AWXCLIENT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_path(&path)?;

        // Variável de ambiente tem precedência sobre o arquivo para a URL do AWX.
        if let Ok(url) = std::env::var("AWX_URL") {
            if !url.is_empty() {
                config.awx_url = url;
            }
        }

        Ok(config)
    }

    /// Lê `path`, ou devolve os defaults se ele não existir.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        config
            .poll
            .validate()
            .map_err(|e| anyhow!("{}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }
}
