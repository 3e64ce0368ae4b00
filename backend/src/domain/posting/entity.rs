//! Posting entity and its state machine.

use chrono::{DateTime, Utc};

use super::{PostingError, PostingId, PostingStatus, Role, Transition, ensure_ordered};

/// Input payload for creating a posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingDraft {
    pub owner: String,
    pub role: Role,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    /// Defaults to the creation time when omitted.
    pub available_from: Option<DateTime<Utc>>,
    /// `None` means available indefinitely.
    pub available_until: Option<DateTime<Utc>>,
}

impl PostingDraft {
    /// Start a draft with the required fields and an open-ended window.
    ///
    /// # Examples
    ///
    /// ```
    /// use lendboard::domain::{PostingDraft, Role};
    ///
    /// let draft = PostingDraft::new("Alice", Role::Lender, "Scientific Calculator", "Calculator")
    ///     .with_description("TI-84, available for borrowing");
    /// assert!(draft.available_until.is_none());
    /// ```
    pub fn new(
        owner: impl Into<String>,
        role: Role,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            role,
            name: name.into(),
            category: category.into(),
            description: None,
            available_from: None,
            available_until: None,
        }
    }

    /// Attach a free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the availability window bounds.
    #[must_use]
    pub fn with_window(
        mut self,
        available_from: Option<DateTime<Utc>>,
        available_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.available_from = available_from;
        self.available_until = available_until;
        self
    }
}

/// Field changes requested for an `ACTIVE` posting.
///
/// `None` and blank strings leave the corresponding field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_until: Option<DateTime<Utc>>,
}

/// A stored offer or request for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    id: PostingId,
    owner: String,
    role: Role,
    name: String,
    category: String,
    description: Option<String>,
    available_from: DateTime<Utc>,
    available_until: Option<DateTime<Utc>>,
    status: PostingStatus,
}

impl Posting {
    /// Open a new `ACTIVE` posting.
    ///
    /// `now` fills in a missing `available_from`. The resolved window must
    /// not close before it opens.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::InvalidTimeWindow`] when the resolved
    /// `available_from` is later than `available_until`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use lendboard::domain::{Posting, PostingDraft, PostingId, PostingStatus, Role};
    ///
    /// let now = Utc::now();
    /// let draft = PostingDraft::new("Bob", Role::Lender, "Basic Calculator", "Calculator")
    ///     .with_window(None, Some(now + Duration::days(2)));
    /// let posting = Posting::open(PostingId::FIRST, draft, now)?;
    /// assert_eq!(posting.status(), PostingStatus::Active);
    /// assert_eq!(posting.available_from(), now);
    /// # Ok::<(), lendboard::domain::PostingError>(())
    /// ```
    pub fn open(
        id: PostingId,
        draft: PostingDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, PostingError> {
        let available_from = draft.available_from.unwrap_or(now);
        if let Some(until) = draft.available_until {
            ensure_ordered(available_from, until)?;
        }

        Ok(Self {
            id,
            owner: draft.owner,
            role: draft.role,
            name: draft.name,
            category: draft.category,
            description: draft.description,
            available_from,
            available_until: draft.available_until,
            status: PostingStatus::Active,
        })
    }

    pub fn id(&self) -> PostingId {
        self.id
    }

    pub fn owner(&self) -> &str {
        self.owner.as_str()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn available_from(&self) -> DateTime<Utc> {
        self.available_from
    }

    pub fn available_until(&self) -> Option<DateTime<Utc>> {
        self.available_until
    }

    pub fn status(&self) -> PostingStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == PostingStatus::Active
    }

    /// Apply the supplied field changes.
    ///
    /// Only the two newly supplied bounds are compared with each other; a
    /// single new bound is not checked against the bound already stored.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::NotActive`] for terminal postings and
    /// [`PostingError::InvalidTimeWindow`] when both new bounds are supplied
    /// out of order. The posting is unchanged on error.
    pub fn apply_update(&mut self, update: PostingUpdate) -> Result<(), PostingError> {
        if !self.is_active() {
            return Err(PostingError::NotActive {
                id: self.id,
                status: self.status,
            });
        }
        if let (Some(from), Some(until)) = (update.available_from, update.available_until) {
            ensure_ordered(from, until)?;
        }

        if let Some(name) = supplied(update.name) {
            self.name = name;
        }
        if let Some(category) = supplied(update.category) {
            self.category = category;
        }
        if let Some(description) = supplied(update.description) {
            self.description = Some(description);
        }
        if let Some(from) = update.available_from {
            self.available_from = from;
        }
        if let Some(until) = update.available_until {
            self.available_until = Some(until);
        }
        Ok(())
    }

    /// Withdraw an `ACTIVE` posting.
    pub fn cancel(&mut self) -> Transition {
        self.close(PostingStatus::Cancelled)
    }

    /// Mark an `ACTIVE` posting as fulfilled.
    pub fn fulfill(&mut self) -> Transition {
        self.close(PostingStatus::Fulfilled)
    }

    /// Expire an `ACTIVE` posting whose window closed strictly before `now`.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Transition {
        if self.available_until.is_some_and(|until| now > until) {
            self.close(PostingStatus::Expired)
        } else {
            Transition::Unchanged(self.status)
        }
    }

    /// Check that the posting may leave the store.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::CannotDeleteActive`] while the posting is
    /// still `ACTIVE`.
    pub fn ensure_deletable(&self) -> Result<(), PostingError> {
        if self.is_active() {
            return Err(PostingError::CannotDeleteActive { id: self.id });
        }
        Ok(())
    }

    fn close(&mut self, terminal: PostingStatus) -> Transition {
        if !self.is_active() {
            return Transition::Unchanged(self.status);
        }
        self.status = terminal;
        Transition::Applied(terminal)
    }
}

fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}
