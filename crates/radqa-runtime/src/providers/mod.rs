//! Generation backend implementations.
//!
//! The pipeline consumes backends through the
//! [`TextGenerator`](crate::generator::TextGenerator) trait; the
//! implementations here are conveniences, not requirements. All of them
//! use the [`secrets`] module for credential handling.

pub mod secrets;

#[cfg(feature = "openai")]
mod openai;

pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "openai")]
pub use openai::{OpenAiGenerator, DEFAULT_MODEL, OPENAI_API_KEY_ENV};
