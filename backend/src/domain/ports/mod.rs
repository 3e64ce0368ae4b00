//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod match_model;
mod posting_repository;

#[cfg(test)]
pub use match_model::MockMatchModel;
pub use match_model::{MatchModel, MatchModelError};
#[cfg(test)]
pub use posting_repository::MockPostingRepository;
pub use posting_repository::{PostingRepository, PostingRepositoryError};
