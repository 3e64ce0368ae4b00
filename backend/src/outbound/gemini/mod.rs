//! Gemini outbound adapter.
//!
//! This module provides a thin HTTP implementation of the `MatchModel` port.

mod dto;
mod http_model;

pub use http_model::{GeminiConfig, GeminiMatchModel, GeminiSetupError};
