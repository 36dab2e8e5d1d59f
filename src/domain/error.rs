//! Domain error types.

/// Top-level error type for salesintel.
#[derive(Debug, thiserror::Error)]
pub enum SalesIntelError {
    #[error("source {source_key} unavailable: {reason}")]
    SourceUnavailable { source_key: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("export failed: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SalesIntelError {
    pub fn source_unavailable(source_key: &str, reason: impl Into<String>) -> Self {
        SalesIntelError::SourceUnavailable {
            source_key: source_key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SalesIntelError> for std::process::ExitCode {
    fn from(err: &SalesIntelError) -> Self {
        let code: u8 = match err {
            SalesIntelError::Io(_) => 1,
            SalesIntelError::ConfigParse { .. }
            | SalesIntelError::ConfigMissing { .. }
            | SalesIntelError::ConfigInvalid { .. } => 2,
            SalesIntelError::SourceUnavailable { .. } => 3,
            SalesIntelError::Export { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
