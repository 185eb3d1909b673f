use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use judgeloop_agent::{Agent, AgentConfig, AgentError, Conversation, OutputCallback, OutputType};
use judgeloop_critic::{CriticEvaluator, EvaluationError, Verdict, WriterPrompts};
use judgeloop_logging::{AgentRole, LogEvent, Logger, StreamType};

/// Produces the next draft from the conversation so far
#[async_trait]
pub trait Generator: Send + Sync {
    /// An empty string means the capability produced no output
    async fn generate(&self, conversation: &Conversation) -> Result<String, AgentError>;
}

/// Scores the latest draft in the conversation
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, conversation: &Conversation) -> Result<Verdict, EvaluationError>;
}

/// Generator backed by a writer agent
pub struct AgentWriter<'a> {
    agent: &'a dyn Agent,
    config: AgentConfig,
    on_output: Option<OutputCallback>,
}

impl<'a> AgentWriter<'a> {
    pub fn new(agent: &'a dyn Agent, config: AgentConfig) -> Self {
        Self {
            agent,
            config,
            on_output: None,
        }
    }

    pub fn with_output_callback(mut self, callback: OutputCallback) -> Self {
        self.on_output = Some(callback);
        self
    }
}

#[async_trait]
impl Generator for AgentWriter<'_> {
    async fn generate(&self, conversation: &Conversation) -> Result<String, AgentError> {
        let prompt = WriterPrompts::build_draft_prompt(conversation);
        debug!(
            prompt_len = prompt.len(),
            turns = conversation.len(),
            "Running writer"
        );

        let output = self
            .agent
            .execute(&prompt, &self.config, self.on_output.clone())
            .await?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Writer completed"
        );

        if !output.success() {
            return Err(AgentError::ExecutionFailed(format!(
                "Writer failed with {}",
                output.failure_summary()
            )));
        }

        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl Evaluator for CriticEvaluator<'_> {
    async fn evaluate(&self, conversation: &Conversation) -> Result<Verdict, EvaluationError> {
        CriticEvaluator::evaluate(self, conversation).await
    }
}

/// Output callback that forwards agent lines to the logger
pub fn stream_to_logger(logger: Arc<Logger>, role: AgentRole) -> OutputCallback {
    Arc::new(move |line: &str, output_type: OutputType| {
        let stream = match output_type {
            OutputType::Stdout => StreamType::Stdout,
            OutputType::Stderr => StreamType::Stderr,
        };
        logger.log(&LogEvent::AgentStreamLine {
            role,
            stream,
            line: line.to_string(),
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgeloop_agent::{AgentOutput, AgentType, Turn};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    struct EchoAgent {
        stdout: &'static str,
        exit_code: i32,
    }

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            "echo"
        }

        fn agent_type(&self) -> AgentType {
            AgentType::OpenCode
        }

        async fn execute(
            &self,
            _prompt: &str,
            _config: &AgentConfig,
            _on_output: Option<OutputCallback>,
        ) -> Result<AgentOutput, AgentError> {
            Ok(AgentOutput::new(
                self.stdout.to_string(),
                "quota exceeded".to_string(),
                self.exit_code,
                Duration::from_millis(5),
            ))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn binary_path(&self) -> &Path {
            Path::new("echo")
        }
    }

    fn conversation() -> Conversation {
        let mut conversation = Conversation::seeded("Write about lighthouses");
        conversation.push(Turn::assistant("old draft"));
        conversation.push(Turn::user("Feedback: more history"));
        conversation
    }

    #[tokio::test]
    async fn test_writer_returns_trimmed_stdout() {
        let agent = EchoAgent {
            stdout: "\n# Lighthouses\n\nThey guide ships.\n\n",
            exit_code: 0,
        };
        let writer = AgentWriter::new(&agent, AgentConfig::new(PathBuf::from(".")));

        let draft = writer.generate(&conversation()).await.unwrap();
        assert_eq!(draft, "# Lighthouses\n\nThey guide ships.");
    }

    #[tokio::test]
    async fn test_writer_nonzero_exit_is_generation_error() {
        let agent = EchoAgent {
            stdout: "",
            exit_code: 2,
        };
        let writer = AgentWriter::new(&agent, AgentConfig::new(PathBuf::from(".")));

        let err = writer.generate(&conversation()).await.unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_critic_evaluator_through_trait_object() {
        let agent = EchoAgent {
            stdout: "<verdict>{\"score\": \"pass\", \"feedback\": \"\"}</verdict>",
            exit_code: 0,
        };
        let critic = CriticEvaluator::new(&agent, AgentConfig::new(PathBuf::from(".")));
        let evaluator: &dyn Evaluator = &critic;

        let verdict = evaluator.evaluate(&conversation()).await.unwrap();
        assert!(verdict.is_pass());
    }
}
