//! Smart match pipeline.
//!
//! A query is answered in stages: select candidates, build a prompt, call
//! the model, extract the match array, validate the batch, and assemble the
//! results. Every stage except the model call is a pure function defined
//! here; [`crate::domain::SmartMatchService`] wires them together.

use thiserror::Error;

use crate::domain::ports::MatchModelError;
use crate::domain::{Posting, PostingError};

mod assemble;
mod extraction;
mod prompt;
mod validation;

pub use assemble::assemble_results;
pub use extraction::{Extracted, NoMatchReason, RawMatch, extract_matches};
pub use prompt::{MatchPrompt, MatchQuery};
pub use validation::{
    MIN_RELEVANCE_SCORE, MatchValidationError, StaleReason, ValidatedMatch, validate_batch,
};

/// One accepted match: the candidate posting and the model's reason for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartMatchResult {
    pub posting: Posting,
    pub rationale: String,
}

/// Errors surfaced by a smart match request.
///
/// A model reply without a usable array is not an error; it yields an empty
/// result instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// Candidate selection failed in the posting store.
    #[error(transparent)]
    Selection(#[from] PostingError),
    /// Candidates could not be rendered into a prompt.
    #[error("failed to build match prompt: {message}")]
    Prompt { message: String },
    /// The model call failed.
    #[error(transparent)]
    Model(#[from] MatchModelError),
    /// The model's batch failed validation.
    #[error(transparent)]
    Validation(#[from] MatchValidationError),
}

impl From<serde_json::Error> for MatchError {
    fn from(error: serde_json::Error) -> Self {
        Self::Prompt {
            message: error.to_string(),
        }
    }
}
