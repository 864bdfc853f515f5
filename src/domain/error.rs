//! Domain error types.

/// Top-level error type for momtrader.
#[derive(Debug, thiserror::Error)]
pub enum MomtraderError {
    #[error("no signals: {reason}")]
    NoData { reason: String },

    #[error("{component} error: {reason}")]
    Collaborator { component: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MomtraderError {
    pub fn collaborator(component: &str, reason: impl Into<String>) -> Self {
        MomtraderError::Collaborator {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MomtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            MomtraderError::ConfigParse { .. }
                | MomtraderError::ConfigMissing { .. }
                | MomtraderError::ConfigInvalid { .. }
        )
    }
}

impl From<&MomtraderError> for std::process::ExitCode {
    fn from(err: &MomtraderError) -> Self {
        let code: u8 = match err {
            MomtraderError::Io(_) => 1,
            MomtraderError::ConfigParse { .. }
            | MomtraderError::ConfigMissing { .. }
            | MomtraderError::ConfigInvalid { .. } => 2,
            MomtraderError::Database { .. } | MomtraderError::DatabaseQuery { .. } => 3,
            MomtraderError::Collaborator { .. } => 4,
            MomtraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
