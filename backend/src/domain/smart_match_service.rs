//! Smart match domain service.
//!
//! Runs one query end to end: candidate selection, prompt, model call,
//! extraction, validation, and assembly. The posting store lock is released
//! before the model is awaited; validation then reads the clock afresh so
//! windows that closed during the call are caught.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info, instrument, warn};

use crate::domain::PostingBoard;
use crate::domain::ports::{MatchModel, PostingRepository};
use crate::domain::smart_match::{
    Extracted, MatchError, MatchPrompt, MatchQuery, SmartMatchResult, assemble_results,
    extract_matches, validate_batch,
};

/// Answers natural-language queries with validated, ranked postings.
pub struct SmartMatchService<R, M> {
    board: Arc<PostingBoard<R>>,
    model: Arc<M>,
    clock: Arc<dyn Clock>,
}

impl<R, M> Clone for SmartMatchService<R, M> {
    fn clone(&self) -> Self {
        Self {
            board: Arc::clone(&self.board),
            model: Arc::clone(&self.model),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, M> SmartMatchService<R, M> {
    /// Create a service over a shared board and model.
    pub fn new(board: Arc<PostingBoard<R>>, model: Arc<M>, clock: Arc<dyn Clock>) -> Self {
        Self {
            board,
            model,
            clock,
        }
    }
}

impl<R, M> SmartMatchService<R, M>
where
    R: PostingRepository,
    M: MatchModel,
{
    /// Return postings of the complementary role that fit `query`, ranked
    /// by the model.
    ///
    /// An empty candidate set short-circuits without calling the model. A
    /// reply that holds no usable array yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`MatchError::Selection`] when the posting store fails.
    /// - [`MatchError::Model`] when the model call fails; it is not retried.
    /// - [`MatchError::Validation`] when any entry names a non-candidate,
    ///   references a posting outside its window, or scores below the floor.
    #[instrument(skip_all, fields(role = %query.role))]
    pub async fn smart_match(
        &self,
        query: MatchQuery,
    ) -> Result<Vec<SmartMatchResult>, MatchError> {
        let candidates = self
            .board
            .select_candidates(query.role, query.requested_at)?;
        if candidates.is_empty() {
            debug!("no active candidates; skipping model call");
            return Ok(Vec::new());
        }

        let prompt = MatchPrompt::build(&query, &candidates)?;
        info!(candidates = candidates.len(), "requesting smart match ranking");
        let reply = self.model.complete(&prompt).await?;
        debug!(reply_len = reply.len(), "received smart match reply");

        let entries = match extract_matches(&reply) {
            Extracted::Entries(entries) => entries,
            Extracted::NoMatch(reason) => {
                warn!(%reason, "model reply held no usable match array");
                return Ok(Vec::new());
            }
        };

        let validated_at = self.clock.utc();
        let validated =
            validate_batch(entries, &candidates, validated_at).inspect_err(|error| {
                warn!(%error, "rejected smart match batch");
            })?;

        Ok(assemble_results(validated, &candidates)?)
    }
}

#[cfg(test)]
#[path = "smart_match_service_tests.rs"]
mod tests;
