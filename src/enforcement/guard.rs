//! Type-state guard for the ask-before-acting rule.
//!
//! [`Awaiting`] can only be resolved; [`Cleared`] can only proceed. Code
//! holding an `Awaiting` has no way to run the guarded action without first
//! supplying an answer.

use super::orchestrator::ClarifyOutcome;
use crate::error::{ClarifyError, Result};
use crate::protocol::Stage;
use std::future::Future;

const UNSPECIFIED_REASON: &str = "unspecified";

/// A stop is open: a question has been posed and not yet answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Awaiting {
    question: String,
    directive_id: String,
    stage: Stage,
}

impl Awaiting {
    pub fn new(question: impl Into<String>, directive_id: impl Into<String>, stage: Stage) -> Self {
        Self {
            question: question.into(),
            directive_id: directive_id.into(),
            stage,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn directive_id(&self) -> &str {
        &self.directive_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Record the human's answer and unlock the action.
    pub fn resolve(self, answer: impl Into<String>) -> Cleared {
        tracing::debug!(directive_id = %self.directive_id, stage = %self.stage, "Stop resolved");
        Cleared {
            answer: Some(answer.into()),
        }
    }
}

/// No stop is open; the action may run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cleared {
    answer: Option<String>,
}

impl Cleared {
    pub fn new() -> Self {
        Self::default()
    }

    /// The answer that resolved the stop, if there was one.
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub async fn proceed<F, Fut, T>(self, action: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        action().await
    }

    pub fn proceed_sync<F, T>(self, action: F) -> T
    where
        F: FnOnce() -> T,
    {
        action()
    }
}

/// Either guard state, for callers that only know which one at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedAction {
    Awaiting(Awaiting),
    Cleared(Cleared),
}

impl GuardedAction {
    /// Build the guard matching an enforcer outcome. An uncleared outcome
    /// must carry a non-empty question, a directive id and a stage.
    pub fn from_outcome(outcome: &ClarifyOutcome) -> Result<Self> {
        if outcome.clarified {
            return Ok(Self::Cleared(Cleared::new()));
        }
        match (&outcome.question, &outcome.directive_id, outcome.stage) {
            (Some(question), Some(directive_id), Some(stage))
                if !question.trim().is_empty() && !directive_id.is_empty() =>
            {
                Ok(Self::Awaiting(Awaiting::new(
                    question.clone(),
                    directive_id.clone(),
                    stage,
                )))
            }
            _ => Err(ClarifyError::Protocol(
                "unresolved outcome must carry question, directive id and stage".into(),
            )),
        }
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Cleared(_))
    }

    pub fn resolve(self, answer: impl Into<String>) -> Cleared {
        match self {
            Self::Awaiting(awaiting) => awaiting.resolve(answer),
            Self::Cleared(cleared) => cleared,
        }
    }

    fn unresolved(stage: Stage) -> ClarifyError {
        tracing::warn!(stage = %stage, "Attempted to proceed past an unresolved stop");
        ClarifyError::UnresolvedStop {
            stage,
            reason: UNSPECIFIED_REASON.to_string(),
        }
    }

    /// Run `action` if cleared. An awaiting guard refuses with
    /// [`ClarifyError::UnresolvedStop`] and never calls `action`.
    pub async fn proceed<F, Fut, T>(self, action: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self {
            Self::Awaiting(awaiting) => Err(Self::unresolved(awaiting.stage)),
            Self::Cleared(cleared) => Ok(cleared.proceed(action).await),
        }
    }

    pub fn proceed_sync<F, T>(self, action: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        match self {
            Self::Awaiting(awaiting) => Err(Self::unresolved(awaiting.stage)),
            Self::Cleared(cleared) => Ok(cleared.proceed_sync(action)),
        }
    }
}

impl From<Awaiting> for GuardedAction {
    fn from(value: Awaiting) -> Self {
        Self::Awaiting(value)
    }
}

impl From<Cleared> for GuardedAction {
    fn from(value: Cleared) -> Self {
        Self::Cleared(value)
    }
}
