//! Tipos de erro para o cliente da API do AWX.
//!
//! Define [`AwxError`] com variantes para erros HTTP retornados pela API
//! e erros de rede. A classificação (erro de cliente, acesso negado) é feita
//! pelo código de status, nunca pelo texto da mensagem.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com a API do AWX.
#[derive(Debug, Error)]
pub enum AwxError {
    /// Erro retornado pela API (ex.: 400 requisição inválida, 404 grupo inexistente).
    /// Contém o código de status HTTP e o corpo da resposta.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout, JSON inválido).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AwxError {
    /// `true` para 400 e 404: o pedido referencia algo que não existe ou é inválido.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AwxError::Api { status: 400 | 404, .. })
    }

    /// `true` para 401 e 403.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AwxError::Api { status: 401 | 403, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = AwxError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error (status 404): Not found");
    }

    #[test]
    fn classification_by_status() {
        let bad_request = AwxError::Api {
            status: 400,
            message: String::new(),
        };
        assert!(bad_request.is_client_error());
        assert!(!bad_request.is_unauthorized());

        let forbidden = AwxError::Api {
            status: 403,
            message: String::new(),
        };
        assert!(forbidden.is_unauthorized());
        assert!(!forbidden.is_client_error());

        let server = AwxError::Api {
            status: 502,
            message: String::new(),
        };
        assert!(!server.is_client_error());
        assert!(!server.is_unauthorized());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AwxError>();
    }
}
