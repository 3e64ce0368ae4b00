//! Join validated matches back to their postings.

use super::SmartMatchResult;
use super::validation::{MatchValidationError, ValidatedMatch};
use crate::domain::Posting;

/// Pair each validated match with its full candidate posting, in the order
/// the model ranked them.
///
/// # Errors
///
/// Returns [`MatchValidationError::UnknownPostingId`] if an entry names a
/// posting missing from `candidates`. Validation against the same slice
/// rules this out.
pub fn assemble_results(
    validated: Vec<ValidatedMatch>,
    candidates: &[Posting],
) -> Result<Vec<SmartMatchResult>, MatchValidationError> {
    validated
        .into_iter()
        .map(|entry| {
            let posting = candidates
                .iter()
                .find(|posting| posting.id() == entry.id)
                .ok_or_else(|| MatchValidationError::UnknownPostingId {
                    id: entry.id.to_string(),
                })?;
            Ok(SmartMatchResult {
                posting: posting.clone(),
                rationale: entry.rationale,
            })
        })
        .collect()
}
