mod artifact;
mod capability;
mod error;
mod loop_runner;
mod outcome;
mod state;

pub use artifact::{derive_filename, ArtifactPersister, DEFAULT_FILENAME};
pub use capability::{stream_to_logger, AgentWriter, Evaluator, Generator};
pub use error::RunError;
pub use loop_runner::LoopRunner;
pub use outcome::{RunOutcome, RunSummary};
pub use state::{AttemptRecord, RunState, TerminationReason, DEFAULT_MAX_ATTEMPTS};
