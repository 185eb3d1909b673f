use judgeloop_agent::{Agent, AgentConfig, Conversation, OutputCallback, Role};
use tracing::{debug, info};

use crate::{CriticPrompts, Verdict, VerdictParseError};

/// Evaluator that runs the critic agent over the conversation
pub struct CriticEvaluator<'a> {
    agent: &'a dyn Agent,
    config: AgentConfig,
    on_output: Option<OutputCallback>,
}

impl<'a> CriticEvaluator<'a> {
    pub fn new(agent: &'a dyn Agent, config: AgentConfig) -> Self {
        Self {
            agent,
            config,
            on_output: None,
        }
    }

    /// Stream critic output lines to `callback` while it runs
    pub fn with_output_callback(mut self, callback: OutputCallback) -> Self {
        self.on_output = Some(callback);
        self
    }

    /// Evaluate the latest draft in `conversation`
    pub async fn evaluate(&self, conversation: &Conversation) -> Result<Verdict, EvaluationError> {
        let attempt = conversation
            .turns()
            .iter()
            .filter(|t| t.role() == Role::Assistant)
            .count();
        let prompt = CriticPrompts::build_evaluation_prompt(conversation, attempt);

        debug!(
            prompt_len = prompt.len(),
            attempt,
            "Running critic evaluation"
        );

        let output = self
            .agent
            .execute(&prompt, &self.config, self.on_output.clone())
            .await
            .map_err(|e| EvaluationError::AgentError(e.to_string()))?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Critic completed"
        );

        if !output.success() {
            return Err(EvaluationError::AgentError(format!(
                "Critic failed with {}",
                output.failure_summary()
            )));
        }

        Verdict::parse(&output.stdout).map_err(EvaluationError::ParseError)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Agent execution error: {0}")]
    AgentError(String),

    #[error("Failed to parse critic verdict: {0}")]
    ParseError(#[from] VerdictParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use judgeloop_agent::{AgentError, AgentOutput, AgentType, Turn};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::Score;

    /// Agent that answers every prompt with a fixed output
    struct CannedAgent {
        stdout: String,
        exit_code: i32,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedAgent {
        fn new(stdout: &str, exit_code: i32) -> Self {
            Self {
                stdout: stdout.to_string(),
                exit_code,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Agent for CannedAgent {
        fn name(&self) -> &str {
            "canned"
        }

        fn agent_type(&self) -> AgentType {
            AgentType::ClaudeCode
        }

        async fn execute(
            &self,
            prompt: &str,
            _config: &AgentConfig,
            _on_output: Option<OutputCallback>,
        ) -> Result<AgentOutput, AgentError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(AgentOutput::new(
                self.stdout.clone(),
                "critic crashed".to_string(),
                self.exit_code,
                Duration::from_millis(10),
            ))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn binary_path(&self) -> &Path {
            Path::new("canned")
        }
    }

    fn conversation_with_drafts(drafts: usize) -> Conversation {
        let mut conversation = Conversation::seeded("Write about kites");
        for i in 0..drafts {
            conversation.push(Turn::assistant(format!("draft {}", i + 1)));
            if i + 1 < drafts {
                conversation.push(Turn::user("Feedback: try again"));
            }
        }
        conversation
    }

    #[tokio::test]
    async fn test_evaluate_parses_verdict_and_counts_attempts() {
        let agent = CannedAgent::new(
            "<verdict>{\"score\": \"needs_improvement\", \"feedback\": \"More wind\"}</verdict>",
            0,
        );
        let evaluator = CriticEvaluator::new(&agent, AgentConfig::new(PathBuf::from(".")));

        let verdict = evaluator
            .evaluate(&conversation_with_drafts(2))
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::new(Score::NeedsImprovement, "More wind"));
        let prompts = agent.prompts.lock().unwrap();
        assert!(prompts[0].contains("This is attempt 2."));
    }

    #[tokio::test]
    async fn test_evaluate_nonzero_exit_is_agent_error() {
        let agent = CannedAgent::new("", 1);
        let evaluator = CriticEvaluator::new(&agent, AgentConfig::new(PathBuf::from(".")));

        let err = evaluator
            .evaluate(&conversation_with_drafts(1))
            .await
            .unwrap_err();

        assert!(matches!(err, EvaluationError::AgentError(_)));
        assert!(err.to_string().contains("critic crashed"));
    }

    #[tokio::test]
    async fn test_evaluate_unparseable_output_is_parse_error() {
        let agent = CannedAgent::new("Looks fine to me.", 0);
        let evaluator = CriticEvaluator::new(&agent, AgentConfig::new(PathBuf::from(".")));

        let err = evaluator
            .evaluate(&conversation_with_drafts(1))
            .await
            .unwrap_err();

        assert!(matches!(err, EvaluationError::ParseError(_)));
    }
}
