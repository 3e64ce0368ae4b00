//! In-memory posting store.
//!
//! Postings live in a `BTreeMap` keyed by their identifier. Identifiers are
//! allocated in increasing order, so key order is insertion order.

use std::collections::BTreeMap;

use crate::domain::ports::{PostingRepository, PostingRepositoryError};
use crate::domain::{Posting, PostingId};

/// Posting store adapter backed by process memory.
#[derive(Debug, Clone)]
pub struct InMemoryPostingRepository {
    postings: BTreeMap<PostingId, Posting>,
    next_id: Option<PostingId>,
}

impl Default for InMemoryPostingRepository {
    fn default() -> Self {
        Self {
            postings: BTreeMap::new(),
            next_id: Some(PostingId::FIRST),
        }
    }
}

impl InMemoryPostingRepository {
    /// Number of stored postings.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Whether the store holds no postings.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

impl PostingRepository for InMemoryPostingRepository {
    fn next_id(&self) -> Result<PostingId, PostingRepositoryError> {
        self.next_id
            .ok_or_else(|| PostingRepositoryError::unavailable("posting id sequence exhausted"))
    }

    fn insert(&mut self, posting: Posting) -> Result<(), PostingRepositoryError> {
        let expected = self.next_id()?;
        let id = posting.id();
        if id != expected {
            return Err(PostingRepositoryError::conflict(format!(
                "posting {id} inserted out of sequence; expected {expected}"
            )));
        }
        self.postings.insert(id, posting);
        self.next_id = id.next();
        Ok(())
    }

    fn get(&self, id: &PostingId) -> Result<Option<Posting>, PostingRepositoryError> {
        Ok(self.postings.get(id).cloned())
    }

    fn replace(&mut self, posting: Posting) -> Result<(), PostingRepositoryError> {
        let id = posting.id();
        match self.postings.get_mut(&id) {
            Some(slot) => {
                *slot = posting;
                Ok(())
            }
            None => Err(PostingRepositoryError::query(format!(
                "posting {id} is not stored"
            ))),
        }
    }

    fn remove(&mut self, id: &PostingId) -> Result<Option<Posting>, PostingRepositoryError> {
        Ok(self.postings.remove(id))
    }

    fn list(&self) -> Result<Vec<Posting>, PostingRepositoryError> {
        Ok(self.postings.values().cloned().collect())
    }
}
