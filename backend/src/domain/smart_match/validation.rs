//! Gate model output against the candidate set.
//!
//! Three checks run in a fixed order, each over the whole batch before the
//! next begins:
//! 1. every id names a candidate;
//! 2. every referenced posting is inside its availability window at the
//!    time of validation;
//! 3. every score meets [`MIN_RELEVANCE_SCORE`].
//!
//! Any failure rejects the entire batch. No partial result is produced.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::extraction::RawMatch;
use crate::domain::{Posting, PostingId};

/// Lowest score a match may carry.
pub const MIN_RELEVANCE_SCORE: f64 = 30.0;

/// A model entry that passed every gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMatch {
    pub id: PostingId,
    pub rationale: String,
}

/// Why a referenced posting is outside its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The window opens later.
    NotYetAvailable { from: DateTime<Utc> },
    /// The window already closed.
    WindowClosed { until: DateTime<Utc> },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetAvailable { from } => write!(f, "not available until {from}"),
            Self::WindowClosed { until } => write!(f, "availability ended at {until}"),
        }
    }
}

/// Reasons a model batch is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchValidationError {
    /// The model referenced a posting outside the candidate set.
    #[error("model referenced posting id {id:?}, which is not a candidate")]
    UnknownPostingId { id: String },
    /// A referenced posting is outside its availability window.
    #[error("posting {id} is outside its availability window: {reason}")]
    StalePosting { id: PostingId, reason: StaleReason },
    /// A referenced posting scored below the relevance floor.
    #[error("posting {id} scored {score}, below the minimum relevance of {minimum}")]
    BelowRelevanceThreshold {
        id: PostingId,
        score: f64,
        minimum: f64,
    },
}

/// Run every gate over `entries`, in model order.
///
/// Identifiers are compared as exact text against the candidates' canonical
/// form, so `"00"` or `" 0"` do not resolve to posting `0`.
///
/// # Errors
///
/// Returns the first failure of the earliest failing gate.
pub fn validate_batch(
    entries: Vec<RawMatch>,
    candidates: &[Posting],
    now: DateTime<Utc>,
) -> Result<Vec<ValidatedMatch>, MatchValidationError> {
    let resolved = entries
        .into_iter()
        .map(|entry| resolve(entry, candidates))
        .collect::<Result<Vec<_>, _>>()?;

    for (posting, _) in &resolved {
        check_window(posting, now)?;
    }

    for (posting, entry) in &resolved {
        if entry.score < MIN_RELEVANCE_SCORE {
            return Err(MatchValidationError::BelowRelevanceThreshold {
                id: posting.id(),
                score: entry.score,
                minimum: MIN_RELEVANCE_SCORE,
            });
        }
    }

    Ok(resolved
        .into_iter()
        .map(|(posting, entry)| ValidatedMatch {
            id: posting.id(),
            rationale: entry.rationale.unwrap_or_default(),
        })
        .collect())
}

fn resolve(
    entry: RawMatch,
    candidates: &[Posting],
) -> Result<(&Posting, RawMatch), MatchValidationError> {
    match candidates
        .iter()
        .find(|posting| posting.id().to_string() == entry.id)
    {
        Some(posting) => Ok((posting, entry)),
        None => Err(MatchValidationError::UnknownPostingId { id: entry.id }),
    }
}

fn check_window(posting: &Posting, now: DateTime<Utc>) -> Result<(), MatchValidationError> {
    let from = posting.available_from();
    if from > now {
        return Err(MatchValidationError::StalePosting {
            id: posting.id(),
            reason: StaleReason::NotYetAvailable { from },
        });
    }
    if let Some(until) = posting.available_until().filter(|until| *until < now) {
        return Err(MatchValidationError::StalePosting {
            id: posting.id(),
            reason: StaleReason::WindowClosed { until },
        });
    }
    Ok(())
}
