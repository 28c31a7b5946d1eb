use thiserror::Error;

/// Error taxonomy for the ingestion core.
///
/// Each variant corresponds to one of the error kinds the pipeline must
/// distinguish: configuration failures are fatal at startup, transport and
/// parse failures are per-filing and recorded rather than propagated,
/// merge-preflight and storage failures abort or roll back a single
/// accession's merge, and business-rule warnings are never fatal.
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error ({status:?}): {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("merge preflight failed: {0}")]
    MergePreflight(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("business rule warning: {0}")]
    BusinessRuleWarning(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EdgarResult<T> = Result<T, EdgarError>;

impl From<config::ConfigError> for EdgarError {
    fn from(err: config::ConfigError) -> Self {
        EdgarError::Config(err.to_string())
    }
}

impl EdgarError {
    pub fn config<T: std::fmt::Display>(message: T) -> Self {
        EdgarError::Config(message.to_string())
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        EdgarError::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn parse<T: std::fmt::Display>(message: T) -> Self {
        EdgarError::Parse(message.to_string())
    }

    pub fn validation<T: std::fmt::Display>(message: T) -> Self {
        EdgarError::Validation(message.to_string())
    }

    pub fn storage<T: std::fmt::Display>(message: T) -> Self {
        EdgarError::Storage(message.to_string())
    }

    /// The taxonomy kind this error belongs to, for tagging processing-log rows.
    pub fn kind(&self) -> &'static str {
        match self {
            EdgarError::Config(_) => "config",
            EdgarError::Transport { .. } => "transport",
            EdgarError::Parse(_) => "parse",
            EdgarError::Validation(_) => "validation",
            EdgarError::MergePreflight(_) => "merge_preflight",
            EdgarError::Storage(_) => "storage",
            EdgarError::BusinessRuleWarning(_) => "business_rule_warning",
            EdgarError::Io(_) => "io",
            EdgarError::Sqlite(_) => "storage",
            EdgarError::Http(_) => "transport",
            EdgarError::Json(_) => "parse",
        }
    }

    /// Log the error at the level appropriate to its taxonomy kind, with context.
    pub fn log_with_context(&self, context: &str) {
        match self {
            EdgarError::Config(_) | EdgarError::Storage(_) | EdgarError::Sqlite(_) => {
                tracing::error!("{context} - {}: {self}", self.kind());
            }
            EdgarError::MergePreflight(_) => {
                tracing::warn!("{context} - {}: {self}", self.kind());
            }
            EdgarError::BusinessRuleWarning(_) => {
                tracing::warn!("{context} - {}: {self}", self.kind());
            }
            _ => {
                tracing::warn!("{context} - {}: {self}", self.kind());
            }
        }
    }
}
