use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("unknown financing tier {index}; expected 0..={max}")]
    UnknownFinancingTier { index: usize, max: usize },

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid API JSON payload: {0}")]
    Payload(String),
}

impl ConfigError {
    pub fn invalid(field: &str, reason: &str) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Payload(e.to_string())
    }
}
