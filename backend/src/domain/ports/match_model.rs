//! Driven port for the external text-generation model that ranks candidates.
//!
//! The model is opaque: a prompt goes in, free text comes out. Nothing the
//! model returns is trusted until the smart match validator has accepted it.

use async_trait::async_trait;

use crate::domain::smart_match::MatchPrompt;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced while calling the model.
    pub enum MatchModelError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "match model transport failed: {message}",
        /// The call exceeded its timeout.
        Timeout { message: String } =>
            "match model timeout: {message}",
        /// The provider rate-limited or exhausted the quota for the request.
        RateLimited { message: String } =>
            "match model rate limited request: {message}",
        /// The provider response could not be decoded into text.
        Decode { message: String } =>
            "match model response decode failed: {message}",
        /// The provider rejected the request.
        InvalidRequest { message: String } =>
            "match model request invalid: {message}",
        /// No model is configured or reachable.
        Unavailable { message: String } =>
            "match model unavailable: {message}",
    }
}

/// Port for asking the model to rank candidate postings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchModel: Send + Sync {
    /// Send one prompt and return the raw reply text.
    ///
    /// Failures are never retried by the caller.
    async fn complete(&self, prompt: &MatchPrompt) -> Result<String, MatchModelError>;
}
