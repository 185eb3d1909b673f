//! # judgeloop-critic
//!
//! The critic side of the loop: verdicts, how they are parsed out of free-form
//! agent output, and the prompts that steer both the critic and the writer.

pub mod evaluator;
mod prompts;
mod verdict;

pub use evaluator::{CriticEvaluator, EvaluationError};
pub use prompts::{CriticPrompts, WriterPrompts};
pub use verdict::{Score, Verdict, VerdictParseError};
