use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use judgeloop_agent::{Conversation, Turn};
use judgeloop_critic::Score;

use crate::artifact::derive_filename;

pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Approved,
    BudgetExhausted,
}

/// Record of a single generate/evaluate round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: usize,
    pub draft_chars: usize,
    pub score: Score,
    pub feedback: String,
    pub generation_secs: f64,
    pub evaluation_secs: f64,
    pub timestamp: DateTime<Utc>,
}

/// Mutable state of one run, owned by the loop runner
#[derive(Debug)]
pub struct RunState {
    topic: String,
    conversation: Conversation,
    /// Rejected rounds so far
    attempt: usize,
    max_attempts: usize,
    latest_draft: Option<String>,
    /// Fixed by the first non-empty draft
    file_name: Option<String>,
    termination: Option<TerminationReason>,
    history: Vec<AttemptRecord>,
    started_at: Instant,
}

impl RunState {
    /// Start a run; a budget of zero is raised to one round
    pub fn new(topic: impl Into<String>, max_attempts: usize) -> Self {
        let topic = topic.into();
        Self {
            conversation: Conversation::seeded(topic.clone()),
            topic,
            attempt: 0,
            max_attempts: max_attempts.max(1),
            latest_draft: None,
            file_name: None,
            termination: None,
            history: Vec::new(),
            started_at: Instant::now(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// 1-based number of the round in progress
    pub fn current_attempt(&self) -> usize {
        self.attempt + 1
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn latest_draft(&self) -> Option<&str> {
        self.latest_draft.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.termination
    }

    /// Append the writer's output as an assistant turn.
    ///
    /// Empty output still takes its place in the conversation, but leaves the
    /// latest draft untouched.
    pub fn record_draft(&mut self, draft: String) {
        if !draft.is_empty() {
            if self.file_name.is_none() {
                self.file_name = Some(derive_filename(&draft));
            }
            self.latest_draft = Some(draft.clone());
        }
        self.conversation.push(Turn::assistant(draft));
    }

    /// Append rejected feedback as the next user turn and count the round
    pub fn record_rejection(&mut self, feedback: &str) {
        self.conversation
            .push(Turn::user(format!("Feedback: {}", feedback)));
        self.attempt += 1;
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    pub fn push_record(&mut self, record: AttemptRecord) {
        self.history.push(record);
    }

    pub fn terminate(&mut self, reason: TerminationReason) {
        self.termination = Some(reason);
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Rounds performed, counting an approving round
    pub fn attempts_used(&self) -> usize {
        match self.termination {
            Some(TerminationReason::Approved) => self.attempt + 1,
            _ => self.attempt,
        }
    }

    pub(crate) fn into_parts(self) -> (Conversation, Option<String>, Option<String>, Vec<AttemptRecord>) {
        (
            self.conversation,
            self.latest_draft,
            self.file_name,
            self.history,
        )
    }
}
