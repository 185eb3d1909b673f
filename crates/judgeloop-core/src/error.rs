use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run. None of them are retried.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Generation failed: {0}")]
    Generation(#[source] judgeloop_agent::AgentError),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[source] judgeloop_critic::EvaluationError),

    #[error("Failed to write {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No draft was produced after {attempts} attempt(s)")]
    EmptyResult { attempts: usize },
}
