//! Posting lifecycle service.
//!
//! `PostingBoard` owns the posting store behind a single mutex and enforces
//! the posting state machine:
//! - create and update validate the availability window;
//! - cancel, fulfil, and expire are silent no-ops unless the posting is
//!   `ACTIVE`;
//! - delete requires a terminal status.
//!
//! Every operation performs its read-check-write under one lock
//! acquisition and never holds the lock across an await point.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{PostingRepository, PostingRepositoryError};
use crate::domain::{
    Posting, PostingDraft, PostingError, PostingId, PostingUpdate, Role, Transition,
};

/// Lifecycle manager and candidate selector over one posting store.
pub struct PostingBoard<R> {
    store: Mutex<R>,
    clock: Arc<dyn Clock>,
}

impl<R> PostingBoard<R> {
    /// Create a board over `store`, reading "now" from `clock` when a
    /// posting is created without an explicit start.
    pub fn new(store: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(store),
            clock,
        }
    }

    /// Current time according to the board's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, R>, PostingError> {
        self.store.lock().map_err(|_| {
            PostingError::Repository(PostingRepositoryError::unavailable(
                "posting store lock poisoned",
            ))
        })
    }
}

impl<R> PostingBoard<R>
where
    R: PostingRepository,
{
    /// Create an `ACTIVE` posting with a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::InvalidTimeWindow`] when the window closes
    /// before it opens; nothing is stored and no identifier is consumed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use lendboard::domain::{PostingBoard, PostingDraft, PostingStatus, Role};
    /// use lendboard::outbound::memory::InMemoryPostingRepository;
    /// use mockable::DefaultClock;
    ///
    /// let board = PostingBoard::new(InMemoryPostingRepository::default(), Arc::new(DefaultClock));
    /// let posting = board.create(PostingDraft::new(
    ///     "Carl",
    ///     Role::Borrower,
    ///     "USB-C to Lightning Charger",
    ///     "Charger",
    /// ))?;
    /// assert_eq!(posting.id().to_string(), "0");
    /// assert_eq!(posting.status(), PostingStatus::Active);
    /// # Ok::<(), lendboard::domain::PostingError>(())
    /// ```
    pub fn create(&self, draft: PostingDraft) -> Result<Posting, PostingError> {
        let now = self.clock.utc();
        let mut store = self.lock_store()?;
        let id = store.next_id()?;
        let posting = Posting::open(id, draft, now)?;
        store.insert(posting.clone())?;
        debug!(id = %posting.id(), role = %posting.role(), "posting created");
        Ok(posting)
    }

    /// Apply field changes to an `ACTIVE` posting.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::PostingNotFound`], [`PostingError::NotActive`],
    /// or [`PostingError::InvalidTimeWindow`]; the stored posting is left as
    /// it was.
    pub fn update(&self, id: PostingId, update: PostingUpdate) -> Result<Posting, PostingError> {
        let mut store = self.lock_store()?;
        let mut posting = find(&*store, id)?;
        posting.apply_update(update)?;
        store.replace(posting.clone())?;
        debug!(%id, "posting updated");
        Ok(posting)
    }

    /// Move an `ACTIVE` posting to `CANCELLED`; no-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::PostingNotFound`] for unknown identifiers.
    pub fn cancel(&self, id: PostingId) -> Result<Transition, PostingError> {
        self.transition(id, Posting::cancel)
    }

    /// Move an `ACTIVE` posting to `FULFILLED`; no-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::PostingNotFound`] for unknown identifiers.
    pub fn fulfill(&self, id: PostingId) -> Result<Transition, PostingError> {
        self.transition(id, Posting::fulfill)
    }

    /// Move an `ACTIVE` posting whose window closed before `now` to
    /// `EXPIRED`; no-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::PostingNotFound`] for unknown identifiers.
    pub fn expire(&self, id: PostingId, now: DateTime<Utc>) -> Result<Transition, PostingError> {
        self.transition(id, |posting| posting.expire(now))
    }

    /// Remove a terminal posting from the store.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::CannotDeleteActive`] while the posting is
    /// `ACTIVE`, or [`PostingError::PostingNotFound`].
    pub fn delete(&self, id: PostingId) -> Result<Posting, PostingError> {
        let mut store = self.lock_store()?;
        let posting = find(&*store, id)?;
        posting.ensure_deletable()?;
        store
            .remove(&id)?
            .ok_or(PostingError::PostingNotFound { id })?;
        debug!(%id, status = %posting.status(), "posting deleted");
        Ok(posting)
    }

    /// Snapshot one posting.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::PostingNotFound`] for unknown identifiers.
    pub fn get(&self, id: PostingId) -> Result<Posting, PostingError> {
        let store = self.lock_store()?;
        find(&*store, id)
    }

    /// Snapshot every posting in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::Repository`] when the store fails.
    pub fn list(&self) -> Result<Vec<Posting>, PostingError> {
        let store = self.lock_store()?;
        Ok(store.list()?)
    }

    /// Expire every `ACTIVE` posting whose window closed before `now`.
    ///
    /// Returns how many postings changed.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::Repository`] when the store fails.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, PostingError> {
        let mut store = self.lock_store()?;
        sweep(&mut *store, now)
    }

    /// Postings eligible to match a query from `query_role` at `now`.
    ///
    /// Expiry is evaluated lazily: every posting is swept through expire
    /// first. The result keeps insertion order and holds only `ACTIVE`
    /// postings of the complementary role.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::Repository`] when the store fails.
    pub fn select_candidates(
        &self,
        query_role: Role,
        now: DateTime<Utc>,
    ) -> Result<Vec<Posting>, PostingError> {
        let mut store = self.lock_store()?;
        sweep(&mut *store, now)?;
        let candidates: Vec<Posting> = store
            .list()?
            .into_iter()
            .filter(|posting| posting.is_active() && posting.role() != query_role)
            .collect();
        debug!(
            %query_role,
            candidates = candidates.len(),
            "selected smart match candidates"
        );
        Ok(candidates)
    }

    fn transition(
        &self,
        id: PostingId,
        apply: impl FnOnce(&mut Posting) -> Transition,
    ) -> Result<Transition, PostingError> {
        let mut store = self.lock_store()?;
        let mut posting = find(&*store, id)?;
        let transition = apply(&mut posting);
        if transition.is_applied() {
            store.replace(posting)?;
            debug!(%id, status = %transition.status(), "posting transitioned");
        }
        Ok(transition)
    }
}

fn find<R: PostingRepository>(store: &R, id: PostingId) -> Result<Posting, PostingError> {
    store
        .get(&id)?
        .ok_or(PostingError::PostingNotFound { id })
}

fn sweep<R: PostingRepository>(store: &mut R, now: DateTime<Utc>) -> Result<usize, PostingError> {
    let mut expired = 0_usize;
    for mut posting in store.list()? {
        if posting.expire(now).is_applied() {
            store.replace(posting)?;
            expired += 1;
        }
    }
    if expired > 0 {
        debug!(expired, "lazily expired postings");
    }
    Ok(expired)
}

#[cfg(test)]
#[path = "posting_board_tests.rs"]
mod tests;
