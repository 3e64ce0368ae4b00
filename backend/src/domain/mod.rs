//! Domain primitives, services, and ports.
//!
//! Purpose: model the posting lifecycle and the smart match pipeline
//! independently of any transport or storage technology.
//!
//! Public surface:
//! - Posting types (`Posting`, `PostingDraft`, `PostingUpdate`, `PostingId`,
//!   `PostingStatus`, `Role`, `Transition`) and `PostingError`.
//! - `PostingBoard`: lifecycle operations and candidate selection over a
//!   `ports::PostingRepository`.
//! - `SmartMatchService`: the end-to-end match flow over a
//!   `ports::MatchModel`.
//! - `smart_match`: the pure pipeline stages and their error types.

pub mod ports;
pub mod posting;
pub mod posting_board;
pub mod smart_match;
pub mod smart_match_service;

pub use self::posting::{
    ParsePostingIdError, ParseRoleError, Posting, PostingDraft, PostingError, PostingId,
    PostingStatus, PostingUpdate, Role, Transition,
};
pub use self::posting_board::PostingBoard;
pub use self::smart_match::{MatchError, SmartMatchResult};
pub use self::smart_match_service::SmartMatchService;
