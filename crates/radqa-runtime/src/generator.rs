//! Text-generation backend abstraction.
//!
//! The pipeline is agnostic to which backend turns a prompt into a
//! completion. Everything it needs is the [`TextGenerator`] trait; the
//! backend owns retry and backoff policy, this crate never retries.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by text-generation backends.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed")]
    Auth,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("generator not configured: {0}")]
    NotConfigured(String),
}

/// A stateless request/response completion backend.
///
/// # Isolation Contract
/// Implementations carry no state the pipeline depends on: the same prompt
/// and temperature may be sent from many stages concurrently.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt` at the given sampling temperature.
    async fn generate(&self, prompt: &str, temperature: f32)
        -> Result<String, GenerationError>;

    /// Backend name for logging and usage accounting.
    fn name(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // Simple estimate: ~4 chars per token
        (text.len() / 4) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _temperature: f32,
        ) -> Result<String, GenerationError> {
            Ok(prompt.to_string())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let generator: Box<dyn TextGenerator> = Box::new(EchoGenerator);
        let out = generator.generate("hello", 0.7).await.unwrap();
        assert_eq!(out, "hello");
        assert_eq!(generator.name(), "echo");
    }

    #[test]
    fn test_token_estimate() {
        assert_eq!(EchoGenerator.estimate_tokens("12345678"), 2);
    }
}
