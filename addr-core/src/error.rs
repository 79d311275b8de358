//! Tipos de erro do `addr-core`.
//!
//! Só falhas de inicialização (gazetteer, configuração, self-test) e de
//! tokenização viram erro. Candidatos descartados durante a varredura nunca
//! são erros: simplesmente não produzem span.

use std::path::PathBuf;

use thiserror::Error;

/// Resultado padrão das operações do crate.
pub type Result<T> = std::result::Result<T, AddressError>;

/// Erros do reconhecedor de endereços.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AddressError {
    /// Nenhuma fonte do gazetteer (cache ou CSV) está disponível.
    #[error("fonte do gazetteer não encontrada: {0}")]
    GazetteerMissing(PathBuf),

    /// A coluna esperada não existe no cabeçalho do CSV.
    #[error("coluna '{column}' não encontrada em {source_name} (colunas: {available})")]
    MissingColumn {
        column: String,
        source_name: String,
        available: String,
    },

    /// Erro de I/O.
    #[error("erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    /// CSV malformado além do que pode ser ignorado linha a linha.
    #[error("erro de CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Cache binário ilegível ou de outra versão.
    #[error("erro no cache do gazetteer: {0}")]
    Cache(String),

    /// Arquivo de configuração JSON inválido.
    #[error("erro de JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Expressão regular inválida em uma tabela de regras.
    #[error("regex inválida: {0}")]
    Regex(#[from] regex::Error),

    /// Valor de configuração fora do domínio aceito.
    #[error("configuração inválida: {0}")]
    Config(String),

    /// Tokens inconsistentes com o texto de entrada.
    #[error("falha de tokenização: {0}")]
    Tokenization(String),

    /// O self-test de detecção falhou.
    #[error("self-test falhou em {failed} de {total} casos: {details}")]
    SelfTest {
        failed: usize,
        total: usize,
        details: String,
    },
}

impl AddressError {
    /// Cria um erro de configuração.
    pub fn config(msg: impl Into<String>) -> Self {
        AddressError::Config(msg.into())
    }

    /// Cria um erro de tokenização.
    pub fn tokenization(msg: impl Into<String>) -> Self {
        AddressError::Tokenization(msg.into())
    }

    /// Cria um erro de cache.
    pub fn cache(msg: impl Into<String>) -> Self {
        AddressError::Cache(msg.into())
    }
}

impl From<bincode::Error> for AddressError {
    fn from(err: bincode::Error) -> Self {
        AddressError::Cache(err.to_string())
    }
}
