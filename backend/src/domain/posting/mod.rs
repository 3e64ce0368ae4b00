//! Posting domain types.
//!
//! A posting is one offer (`LENDER`) or request (`BORROWER`) for a shared
//! item. Postings start `ACTIVE` and move to exactly one terminal status;
//! only terminal postings may be deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::ports::PostingRepositoryError;

mod entity;

pub use entity::{Posting, PostingDraft, PostingUpdate};

/// Opaque posting identifier.
///
/// Identifiers are allocated from a monotonically increasing sequence and are
/// never reused. They serialise as decimal strings (`"0"`, `"1"`, ...) so the
/// external model sees the same shape it is asked to echo back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostingId(u64);

impl PostingId {
    /// The first identifier handed out by an empty store.
    pub const FIRST: Self = Self(0);

    /// Wrap a raw sequence number.
    pub const fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Raw sequence number.
    pub const fn sequence(self) -> u64 {
        self.0
    }

    /// The identifier allocated after this one, if the sequence has room.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for PostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when text is not a posting identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("posting id must be a non-negative integer (got {raw:?})")]
pub struct ParsePostingIdError {
    raw: String,
}

impl FromStr for PostingId {
    type Err = ParsePostingIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParsePostingIdError { raw: s.to_owned() })
    }
}

impl Serialize for PostingId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PostingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Which side of an exchange a posting represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Offers an item.
    Lender,
    /// Seeks an item.
    Borrower,
}

impl Role {
    /// The role a match for this role must carry.
    pub const fn complement(self) -> Self {
        match self {
            Self::Lender => Self::Borrower,
            Self::Borrower => Self::Lender,
        }
    }

    /// Wire label (`LENDER` / `BORROWER`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lender => "LENDER",
            Self::Borrower => "BORROWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when text names no known role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown posting role {raw:?}; expected lender or borrower")]
pub struct ParseRoleError {
    raw: String,
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LENDER" => Ok(Self::Lender),
            "BORROWER" => Ok(Self::Borrower),
            _ => Err(ParseRoleError { raw: s.to_owned() }),
        }
    }
}

/// Lifecycle status of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostingStatus {
    /// Open for matching and editing.
    Active,
    /// The exchange took place.
    Fulfilled,
    /// Withdrawn by its owner.
    Cancelled,
    /// The availability window closed before a match.
    Expired,
}

impl PostingStatus {
    /// Terminal statuses never transition again; only deletion applies.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Wire label (`ACTIVE`, `FULFILLED`, ...).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Fulfilled => "FULFILLED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for PostingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a cancel, fulfil, or expire request.
///
/// Requests whose precondition no longer holds are silent no-ops rather than
/// errors, so callers receive `Unchanged` instead of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The posting moved from `ACTIVE` to the returned terminal status.
    Applied(PostingStatus),
    /// The posting was left as it was.
    Unchanged(PostingStatus),
}

impl Transition {
    /// Whether the request changed the posting.
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Status after the request.
    pub const fn status(self) -> PostingStatus {
        match self {
            Self::Applied(status) | Self::Unchanged(status) => status,
        }
    }
}

/// Errors raised by posting lifecycle operations.
///
/// A failed operation leaves the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostingError {
    /// `available_from` falls after `available_until`.
    #[error("invalid time window: available from {from} is after available until {until}")]
    InvalidTimeWindow {
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    },
    /// Updates apply to `ACTIVE` postings only.
    #[error("posting {id} is {status}; only ACTIVE postings can be updated")]
    NotActive { id: PostingId, status: PostingStatus },
    /// Deletion requires a terminal status.
    #[error("posting {id} is still ACTIVE and cannot be deleted")]
    CannotDeleteActive { id: PostingId },
    /// No posting carries the requested identifier.
    #[error("posting {id} not found")]
    PostingNotFound { id: PostingId },
    /// The store port failed.
    #[error(transparent)]
    Repository(#[from] PostingRepositoryError),
}

/// Reject windows that close before they open.
pub(crate) fn ensure_ordered(
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<(), PostingError> {
    if from > until {
        return Err(PostingError::InvalidTimeWindow { from, until });
    }
    Ok(())
}
