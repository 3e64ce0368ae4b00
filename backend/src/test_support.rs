//! Test utilities for the lendboard crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`, via
//! the `test-support` feature).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{MatchModel, MatchModelError};
use crate::domain::smart_match::MatchPrompt;

/// Clock whose time only moves when a test advances it.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_millis(&self, millis: i64) {
        *self.lock_clock() += TimeDelta::milliseconds(millis);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        *self.lock_clock() += TimeDelta::minutes(minutes);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Model double that replays queued replies and records every prompt.
///
/// Once the queue is empty further calls fail with
/// [`MatchModelError::Unavailable`].
#[derive(Default)]
pub struct ScriptedMatchModel {
    replies: Mutex<VecDeque<Result<String, MatchModelError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedMatchModel {
    /// Queue one successful reply.
    #[must_use]
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queue one failure.
    #[must_use]
    pub fn then_fail(self, error: MatchModelError) -> Self {
        self.push(Err(error));
        self
    }

    /// Prompt texts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        match self.prompts.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => panic!("prompt log mutex"),
        }
    }

    fn push(&self, reply: Result<String, MatchModelError>) {
        match self.replies.lock() {
            Ok(mut guard) => guard.push_back(reply),
            Err(_) => panic!("reply queue mutex"),
        }
    }
}

#[async_trait]
impl MatchModel for ScriptedMatchModel {
    async fn complete(&self, prompt: &MatchPrompt) -> Result<String, MatchModelError> {
        match self.prompts.lock() {
            Ok(mut guard) => guard.push(prompt.as_str().to_owned()),
            Err(_) => panic!("prompt log mutex"),
        }
        let next = match self.replies.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(_) => panic!("reply queue mutex"),
        };
        next.unwrap_or_else(|| Err(MatchModelError::unavailable("no scripted reply left")))
    }
}
