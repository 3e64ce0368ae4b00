//! Port for posting storage.
//!
//! The store owns every posting. Identifiers are allocated from a monotonic
//! sequence: `next_id` peeks at the next free identifier and `insert` must
//! be called with exactly that identifier, which advances the sequence. A
//! failed create therefore never burns an identifier.

use crate::domain::{Posting, PostingId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by posting store adapters.
    pub enum PostingRepositoryError {
        /// The store could not be reached or its guard was poisoned.
        Unavailable { message: String } =>
            "posting store unavailable: {message}",
        /// A read or write failed during execution.
        Query { message: String } =>
            "posting store query failed: {message}",
        /// The write conflicts with stored state (duplicate or out-of-sequence id).
        Conflict { message: String } =>
            "posting store conflict: {message}",
    }
}

/// Port for storing postings in insertion order.
///
/// Methods are synchronous: the only suspension point in the matching flow
/// is the model call, and lifecycle operations complete in one step.
#[cfg_attr(test, mockall::automock)]
pub trait PostingRepository: Send {
    /// Identifier the next inserted posting must carry.
    fn next_id(&self) -> Result<PostingId, PostingRepositoryError>;

    /// Store a new posting carrying the identifier returned by `next_id`.
    fn insert(&mut self, posting: Posting) -> Result<(), PostingRepositoryError>;

    /// Fetch a snapshot of one posting.
    fn get(&self, id: &PostingId) -> Result<Option<Posting>, PostingRepositoryError>;

    /// Overwrite a stored posting in place, keeping its position.
    fn replace(&mut self, posting: Posting) -> Result<(), PostingRepositoryError>;

    /// Remove a posting, returning it when it existed.
    fn remove(&mut self, id: &PostingId) -> Result<Option<Posting>, PostingRepositoryError>;

    /// Snapshot every posting in insertion order.
    fn list(&self) -> Result<Vec<Posting>, PostingRepositoryError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn conflict_error_formats_message() {
        let err = PostingRepositoryError::conflict("id 4 already stored");
        assert_eq!(err.to_string(), "posting store conflict: id 4 already stored");
    }

    #[rstest]
    fn unavailable_error_formats_message() {
        let err = PostingRepositoryError::unavailable("lock poisoned");
        assert!(err.to_string().contains("lock poisoned"));
    }
}
