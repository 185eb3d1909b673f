use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::{AgentOutput, OutputCallback};

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to spawn agent process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Agent binary not found: {0}")]
    NotFound(String),

    #[error("Failed to send the prompt to the agent: {0}")]
    PromptDelivery(#[source] std::io::Error),

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),
}

/// Per-role settings applied to every invocation of an agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub working_dir: PathBuf,
    /// Extra environment for the agent process (credentials, endpoints)
    pub env: HashMap<String, String>,
    pub model: Option<String>,
}

impl AgentConfig {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: HashMap::new(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// The CLI agents judgeloop knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    ClaudeCode,
    OpenCode,
}

impl AgentType {
    /// Executable looked up on PATH when no binary is configured
    pub fn binary_name(self) -> &'static str {
        match self {
            AgentType::ClaudeCode => "claude",
            AgentType::OpenCode => "opencode",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AgentType::ClaudeCode => "Claude Code",
            AgentType::OpenCode => "OpenCode",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::ClaudeCode => write!(f, "claude-code"),
            AgentType::OpenCode => write!(f, "opencode"),
        }
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" | "claude-code" | "claudecode" => Ok(AgentType::ClaudeCode),
            "opencode" | "open-code" => Ok(AgentType::OpenCode),
            _ => Err(format!("Unknown agent type: {}", s)),
        }
    }
}

/// An external program that turns one prompt into text.
///
/// The writer and the critic are both agents; they differ only in the prompt
/// they are handed.
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> AgentType;

    fn name(&self) -> &str {
        self.agent_type().display_name()
    }

    fn binary_path(&self) -> &Path;

    /// Whether the agent binary can be launched at all
    async fn is_available(&self) -> bool;

    /// Run `prompt` to completion, forwarding output lines to `on_output` as they arrive
    async fn execute(
        &self,
        prompt: &str,
        config: &AgentConfig,
        on_output: Option<OutputCallback>,
    ) -> Result<AgentOutput, AgentError>;
}
