// Generation collaborator clients
//
// The orchestrator only sees the ContentClient trait. Concrete backends are
// created through ClientFactory so a run never starts with an unusable client:
// credential and configuration problems surface as SeoError::Configuration
// at construction time.
//
// - gemini: Google Generative Language REST API
// - prompt: language-specific prompt construction shared by backends

pub mod gemini;
pub mod prompt;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::{Result, SeoError};
use crate::record::Language;

/// Text-in/text-out generation collaborator
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Identifier of the collaborator (model name) recorded in reports
    fn identifier(&self) -> &str;

    /// Generate raw text for one item in one language. A single attempt, no retries.
    ///
    /// Per-call failures are `SeoError::Generation`; `SeoError::Configuration`
    /// means the credential was rejected and the run cannot continue.
    async fn generate(&self, identifier: &str, content: &str, language: Language) -> Result<String>;
}

/// Available collaborator backends
#[derive(Debug, Clone)]
pub enum ClientImplementation {
    Gemini,
}

/// Factory for creating client instances
pub struct ClientFactory;

impl ClientFactory {
    /// Create a client of the given implementation after validating its configuration
    pub fn create_client(
        implementation: ClientImplementation,
        config: ClientConfig,
        api_key: String,
    ) -> Result<Box<dyn ContentClient>> {
        if api_key.trim().is_empty() {
            return Err(SeoError::Configuration("API key is empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(SeoError::Configuration("Model name is empty".to_string()));
        }
        if config.endpoint.trim().is_empty() {
            return Err(SeoError::Configuration("Endpoint is empty".to_string()));
        }

        match implementation {
            ClientImplementation::Gemini => Ok(Box::new(gemini::GeminiClient::new(config, api_key)?)),
        }
    }

    /// Create with the default implementation
    pub fn create_default(config: ClientConfig, api_key: String) -> Result<Box<dyn ContentClient>> {
        Self::create_client(ClientImplementation::Gemini, config, api_key)
    }
}
