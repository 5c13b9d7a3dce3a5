//! Tipos de dados para requisições e respostas da API REST v2 do AWX.
//!
//! Somente os campos usados pelo fluxo de build são modelados; o restante do
//! JSON retornado pelo AWX é ignorado na desserialização.

use serde::{Deserialize, Serialize};

/// Envelope paginado usado por todos os endpoints de listagem do AWX.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Total de itens no servidor (não apenas nesta página).
    #[serde(default)]
    pub count: u64,
    /// Itens desta página.
    pub results: Vec<T>,
}

/// Um host registrado em um inventário do AWX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: u64,
    pub name: String,
    /// Inventário ao qual este registro pertence. O mesmo nome pode aparecer em vários.
    pub inventory: u64,
}

/// Corpo de `POST /api/v2/hosts/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewHost {
    pub name: String,
    pub inventory: u64,
    pub description: String,
    pub enabled: bool,
}

impl NewHost {
    pub fn built_by_foreman(name: &str, inventory: u64) -> Self {
        Self {
            name: name.to_string(),
            inventory,
            description: "Host built by Foreman".to_string(),
            enabled: true,
        }
    }
}

/// Um grupo de inventário. Grupos são nomeados pela facility (datacenter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub inventory: u64,
}

/// Resposta de `POST /api/v2/job_templates/{id}/launch/`.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchedJob {
    /// Identificador do job criado.
    pub id: u64,
}

/// Status de um job no AWX.
///
/// Valores desconhecidos caem em [`JobStatus::Unknown`] em vez de falhar a
/// desserialização.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    New,
    Pending,
    Waiting,
    Running,
    Successful,
    Failed,
    Error,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// O job ainda não terminou.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            JobStatus::New | JobStatus::Pending | JobStatus::Waiting | JobStatus::Running
        )
    }

    /// O job terminou sem sucesso.
    pub fn is_failure(self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Error | JobStatus::Canceled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::New => "new",
            JobStatus::Pending => "pending",
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
            JobStatus::Successful => "successful",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
            JobStatus::Canceled => "canceled",
            JobStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Um item de `GET /api/v2/jobs/{id}/job_host_summaries/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSummary {
    /// Job ao qual este resumo pertence.
    pub job: u64,
    /// `true` se o play falhou neste host.
    #[serde(default)]
    pub failed: bool,
    pub summary_fields: SummaryFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryFields {
    pub job: JobDetail,
}

/// Resumo do job embutido em cada [`HostSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetail {
    pub status: JobStatus,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub job_template_name: String,
}
