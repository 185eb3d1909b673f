use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use judgeloop_logging::{LogEvent, Logger};

use crate::artifact::{ArtifactPersister, DEFAULT_FILENAME};
use crate::capability::{Evaluator, Generator};
use crate::error::RunError;
use crate::outcome::RunOutcome;
use crate::state::{AttemptRecord, RunState, TerminationReason};

/// Drives the generate/critique loop and hands the last draft to the persister
pub struct LoopRunner<'a> {
    generator: &'a dyn Generator,
    evaluator: &'a dyn Evaluator,
    persister: ArtifactPersister,
    logger: Arc<Logger>,
    writer_name: String,
    critic_name: String,
}

impl<'a> LoopRunner<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        evaluator: &'a dyn Evaluator,
        persister: ArtifactPersister,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            generator,
            evaluator,
            persister,
            logger,
            writer_name: "writer".to_string(),
            critic_name: "critic".to_string(),
        }
    }

    /// Names shown in the run banner
    pub fn with_agent_names(mut self, writer: impl Into<String>, critic: impl Into<String>) -> Self {
        self.writer_name = writer.into();
        self.critic_name = critic.into();
        self
    }

    /// Run rounds until the critic approves or the budget is spent, then persist
    pub async fn run(&self, mut state: RunState) -> Result<RunOutcome, RunError> {
        self.logger.log(&LogEvent::RunStarted {
            topic: state.topic().to_string(),
            max_attempts: state.max_attempts(),
            writer: self.writer_name.clone(),
            critic: self.critic_name.clone(),
        });

        let reason = loop {
            if let Some(reason) = self.run_attempt(&mut state).await? {
                break reason;
            }
        };
        state.terminate(reason);

        match reason {
            TerminationReason::Approved => {
                self.logger.log(&LogEvent::RunApproved {
                    attempts: state.attempts_used(),
                    duration_secs: state.total_duration().as_secs_f64(),
                });
            }
            TerminationReason::BudgetExhausted => {
                self.logger.log(&LogEvent::MaxAttemptsReached {
                    attempts: state.attempts_used(),
                });
            }
        }

        self.persist(state).await
    }

    /// Run one generate/evaluate round.
    /// Returns Some(reason) if the run should stop, None to continue
    async fn run_attempt(
        &self,
        state: &mut RunState,
    ) -> Result<Option<TerminationReason>, RunError> {
        let attempt = state.current_attempt();

        self.logger.log(&LogEvent::AttemptStarted {
            attempt,
            max_attempts: state.max_attempts(),
        });

        debug!(attempt, turns = state.conversation().len(), "Generating draft");
        let generation_start = Instant::now();
        let draft = self
            .generator
            .generate(state.conversation())
            .await
            .map_err(|e| self.fail(attempt, RunError::Generation(e)))?;
        let generation_secs = generation_start.elapsed().as_secs_f64();

        let draft_chars = draft.chars().count();
        if draft.is_empty() {
            warn!(attempt, "Writer produced no output; evaluating existing context");
        }
        state.record_draft(draft);

        self.logger.log(&LogEvent::DraftGenerated {
            attempt,
            chars: draft_chars,
            duration_secs: generation_secs,
        });

        self.logger.log(&LogEvent::EvaluationStarted { attempt });
        let evaluation_start = Instant::now();
        let verdict = self
            .evaluator
            .evaluate(state.conversation())
            .await
            .map_err(|e| self.fail(attempt, RunError::Evaluation(e)))?;
        let evaluation_secs = evaluation_start.elapsed().as_secs_f64();

        self.logger.log(&LogEvent::VerdictReceived {
            attempt,
            score: verdict.score.to_string(),
            feedback: verdict.feedback.clone(),
            duration_secs: evaluation_secs,
        });

        state.push_record(AttemptRecord {
            attempt,
            draft_chars,
            score: verdict.score,
            feedback: verdict.feedback.clone(),
            generation_secs,
            evaluation_secs,
            timestamp: Utc::now(),
        });

        if verdict.is_pass() {
            info!(attempt, "Draft approved");
            return Ok(Some(TerminationReason::Approved));
        }

        state.record_rejection(&verdict.feedback);
        if state.is_exhausted() {
            return Ok(Some(TerminationReason::BudgetExhausted));
        }

        info!(
            attempt = state.current_attempt(),
            score = %verdict.score,
            "Continuing with feedback"
        );
        Ok(None)
    }

    async fn persist(&self, state: RunState) -> Result<RunOutcome, RunError> {
        let reason = state
            .termination_reason()
            .unwrap_or(TerminationReason::BudgetExhausted);
        let attempts = state.attempts_used();
        let duration = state.total_duration();
        let (conversation, latest_draft, file_name, history) = state.into_parts();

        let Some(draft) = latest_draft else {
            return Err(self.fail(attempts, RunError::EmptyResult { attempts }));
        };
        let file_name = file_name.unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        let artifact = self
            .persister
            .persist(&file_name, &draft)
            .await
            .map_err(|e| self.fail(attempts, e))?;

        self.logger.log(&LogEvent::ArtifactSaved {
            path: artifact.clone(),
            bytes: draft.len(),
        });

        Ok(RunOutcome::new(
            reason,
            attempts,
            artifact,
            draft,
            history,
            conversation,
            duration,
        ))
    }

    fn fail(&self, attempt: usize, error: RunError) -> RunError {
        self.logger.log(&LogEvent::ErrorEncountered {
            attempt,
            error: error.to_string(),
        });
        error
    }
}
