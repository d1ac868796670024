use thiserror::Error;

use crate::record::Language;

#[derive(Error, Debug)]
pub enum SeoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Cannot read source for {identifier}: {message}")]
    SourceRead { identifier: String, message: String },

    #[error("Generation failed for {identifier} ({language}): {message}")]
    Generation {
        identifier: String,
        language: Language,
        message: String,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Interrupted by user")]
    Interrupted,
}

impl SeoError {
    /// Errors that abort the whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Discovery(_))
    }
}

pub type Result<T> = std::result::Result<T, SeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SeoError::Configuration("no key".into()).is_fatal());
        assert!(SeoError::Discovery("gone".into()).is_fatal());
        assert!(!SeoError::SourceRead {
            identifier: "a".into(),
            message: "empty".into(),
        }
        .is_fatal());
        assert!(!SeoError::Generation {
            identifier: "a".into(),
            language: Language::English,
            message: "boom".into(),
        }
        .is_fatal());
    }
}
