use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use judgeloop_agent::Conversation;

use crate::{AttemptRecord, TerminationReason};

/// What a finished run leaves behind, whichever way it ended
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub attempts: usize,
    /// Where the final draft was written
    pub artifact: PathBuf,
    #[serde(skip)]
    pub draft: String,
    /// Feedback from the last verdict
    pub feedback: String,
    pub history: Vec<AttemptRecord>,
    #[serde(skip)]
    pub conversation: Conversation,
    pub total_duration_secs: f64,
}

/// The final outcome of a completed run
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The critic passed the latest draft
    Approved(RunSummary),
    /// The attempt budget ran out; the latest draft was saved anyway
    MaxAttemptsReached(RunSummary),
}

impl RunOutcome {
    pub(crate) fn new(
        reason: TerminationReason,
        attempts: usize,
        artifact: PathBuf,
        draft: String,
        history: Vec<AttemptRecord>,
        conversation: Conversation,
        duration: Duration,
    ) -> Self {
        let feedback = history
            .last()
            .map(|r| r.feedback.clone())
            .unwrap_or_default();
        let summary = RunSummary {
            attempts,
            artifact,
            draft,
            feedback,
            history,
            conversation,
            total_duration_secs: duration.as_secs_f64(),
        };
        match reason {
            TerminationReason::Approved => Self::Approved(summary),
            TerminationReason::BudgetExhausted => Self::MaxAttemptsReached(summary),
        }
    }

    pub fn summary(&self) -> &RunSummary {
        match self {
            Self::Approved(summary) | Self::MaxAttemptsReached(summary) => summary,
        }
    }

    pub fn reason(&self) -> TerminationReason {
        match self {
            Self::Approved(_) => TerminationReason::Approved,
            Self::MaxAttemptsReached(_) => TerminationReason::BudgetExhausted,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved(_))
    }

    pub fn attempts(&self) -> usize {
        self.summary().attempts
    }

    pub fn artifact(&self) -> &Path {
        &self.summary().artifact
    }

    pub fn draft(&self) -> &str {
        &self.summary().draft
    }

    pub fn feedback(&self) -> &str {
        &self.summary().feedback
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.summary().history
    }

    pub fn conversation(&self) -> &Conversation {
        &self.summary().conversation
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.summary().total_duration_secs
    }
}
