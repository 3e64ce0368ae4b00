//! JSON posting seed files.
//!
//! A seed file is a JSON array of posting records:
//!
//! ```json
//! [
//!   {
//!     "owner": "Alice",
//!     "role": "LENDER",
//!     "name": "Scientific Calculator",
//!     "category": "Calculator",
//!     "description": "TI-84, works fine",
//!     "endsInMinutes": 4320
//!   },
//!   { "owner": "Dana", "role": "BORROWER", "name": "Kettle", "category": "Kitchen", "status": "CANCELLED" }
//! ]
//! ```
//!
//! Windows may be absolute (`availableFrom`, `availableUntil` as RFC 3339)
//! or relative to load time (`startsInMinutes`, `endsInMinutes`). Absolute
//! bounds take precedence over relative ones. `status` may close a posting
//! straight after creation.

use std::io::Read;
use std::path::Path;

use cap_std::{ambient_authority, fs::Dir};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::ports::PostingRepository;
use crate::domain::{Posting, PostingBoard, PostingDraft, PostingError, Role};

/// One posting record in a seed file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostingSeed {
    pub owner: String,
    pub role: Role,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub available_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub available_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub starts_in_minutes: Option<i64>,
    #[serde(default)]
    pub ends_in_minutes: Option<i64>,
    #[serde(default)]
    pub status: SeedStatus,
}

/// Status a seeded posting is left in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeedStatus {
    #[default]
    Active,
    Cancelled,
    Fulfilled,
}

impl PostingSeed {
    /// Resolve the record into a draft, anchoring relative offsets at `now`.
    pub fn into_draft(self, now: DateTime<Utc>) -> PostingDraft {
        let offset = |minutes: Option<i64>| minutes.map(|value| now + TimeDelta::minutes(value));
        let from = self.available_from.or_else(|| offset(self.starts_in_minutes));
        let until = self.available_until.or_else(|| offset(self.ends_in_minutes));
        let mut draft = PostingDraft::new(self.owner, self.role, self.name, self.category)
            .with_window(from, until);
        draft.description = self.description;
        draft
    }
}

/// Errors raised while reading a seed file.
#[derive(Debug, Error)]
pub enum SeedFileError {
    /// The path does not name a file.
    #[error("seed path '{path}' must name a file")]
    NotAFile { path: String },
    /// The file could not be opened or read.
    #[error("failed to read seed file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    /// The file is not a valid seed array.
    #[error("invalid seed file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Errors raised while applying seeds to a board.
#[derive(Debug, Error)]
#[error("seed record {index} ({name:?}) was rejected: {source}")]
pub struct SeedApplyError {
    pub index: usize,
    pub name: String,
    pub source: PostingError,
}

/// Read and parse a seed file.
///
/// # Errors
///
/// Returns [`SeedFileError`] when the file cannot be opened, read, or
/// parsed.
pub fn load_seed_file(path: &Path) -> Result<Vec<PostingSeed>, SeedFileError> {
    let display = path.display().to_string();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| SeedFileError::NotAFile {
            path: display.clone(),
        })?;

    let read_error = |source| SeedFileError::Read {
        path: display.clone(),
        source,
    };
    let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    let mut file = directory.open(Path::new(file_name)).map_err(read_error)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(read_error)?;

    parse_seeds(&contents).map_err(|source| SeedFileError::Parse {
        path: display.clone(),
        source,
    })
}

/// Parse seed records from JSON text.
///
/// # Errors
///
/// Returns the decoding error when the text is not a seed array.
pub fn parse_seeds(json: &str) -> Result<Vec<PostingSeed>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Create every seeded posting on `board`, in file order, then apply any
/// requested closing status.
///
/// # Errors
///
/// Stops at the first record the board rejects. Records before it stay
/// created.
pub fn seed_board<R: PostingRepository>(
    board: &PostingBoard<R>,
    seeds: Vec<PostingSeed>,
) -> Result<Vec<Posting>, SeedApplyError> {
    let now = board.now();
    let mut created = Vec::with_capacity(seeds.len());
    for (index, seed) in seeds.into_iter().enumerate() {
        let name = seed.name.clone();
        let status = seed.status;
        let reject = |source| SeedApplyError {
            index,
            name: name.clone(),
            source,
        };

        let posting = board.create(seed.into_draft(now)).map_err(reject)?;
        match status {
            SeedStatus::Active => {}
            SeedStatus::Cancelled => {
                board.cancel(posting.id()).map_err(reject)?;
            }
            SeedStatus::Fulfilled => {
                board.fulfill(posting.id()).map_err(reject)?;
            }
        }
        created.push(board.get(posting.id()).map_err(reject)?);
    }
    Ok(created)
}
