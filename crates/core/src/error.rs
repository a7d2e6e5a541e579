use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// Construction cannot complete (e.g. no base URL).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A tracking call was made without its mandatory fields.
    #[error("Missing required field(s) for {operation}: {}", fields.join(", "))]
    MissingField {
        operation: &'static str,
        fields: Vec<&'static str>,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrackerError {
    pub fn missing(operation: &'static str, fields: Vec<&'static str>) -> Self {
        Self::MissingField { operation, fields }
    }

    pub fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }
}
