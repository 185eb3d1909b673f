//! # judgeloop-agent
//!
//! Agent abstraction for judgeloop: the external CLI agents that draft and
//! review content, plus the conversation log they are both fed.

mod cli;
mod conversation;
mod output;
mod spawner;
mod traits;

pub use cli::CliAgent;
pub use conversation::{Conversation, Role, Turn};
pub use output::{AgentOutput, OutputCallback, OutputType};
pub use spawner::ProcessSpawner;
pub use traits::{Agent, AgentConfig, AgentError, AgentType};

use std::path::PathBuf;

/// Create an agent by type, optionally overriding the binary location
pub fn create_agent(agent_type: AgentType, binary: Option<PathBuf>) -> Box<dyn Agent> {
    match binary {
        Some(path) => Box::new(CliAgent::with_binary_path(agent_type, path)),
        None => Box::new(CliAgent::new(agent_type)),
    }
}
