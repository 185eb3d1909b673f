use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::{
    Agent, AgentConfig, AgentError, AgentOutput, AgentType, OutputCallback, ProcessSpawner,
};

/// An agent driven through its command-line interface in non-interactive mode.
///
/// The prompt is written to the agent's stdin; both `claude --print` and
/// `opencode run` read it from there when it is not a terminal.
pub struct CliAgent {
    agent_type: AgentType,
    binary_path: PathBuf,
}

impl CliAgent {
    pub fn new(agent_type: AgentType) -> Self {
        Self::with_binary_path(agent_type, PathBuf::from(agent_type.binary_name()))
    }

    pub fn with_binary_path(agent_type: AgentType, path: PathBuf) -> Self {
        Self {
            agent_type,
            binary_path: path,
        }
    }

    /// Command-line arguments for a non-interactive run
    pub fn build_args<'a>(&self, model: Option<&'a str>) -> Vec<&'a str> {
        let mut args = vec![match self.agent_type {
            AgentType::ClaudeCode => "--print",
            AgentType::OpenCode => "run",
        }];
        if let Some(model) = model {
            args.extend(["--model", model]);
        }
        args
    }
}

#[async_trait]
impl Agent for CliAgent {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn execute(
        &self,
        prompt: &str,
        config: &AgentConfig,
        on_output: Option<OutputCallback>,
    ) -> Result<AgentOutput, AgentError> {
        debug!(
            agent = self.name(),
            prompt_len = prompt.len(),
            "Executing agent"
        );

        let args = self.build_args(config.model.as_deref());
        ProcessSpawner::spawn(&self.binary_path, &args, Some(prompt), config, on_output).await
    }
}
