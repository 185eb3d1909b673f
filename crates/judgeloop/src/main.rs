mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use judgeloop_agent::create_agent;
use judgeloop_core::{
    stream_to_logger, AgentWriter, ArtifactPersister, LoopRunner, RunOutcome, RunState,
};
use judgeloop_critic::CriticEvaluator;
use judgeloop_logging::{init_tracing, AgentRole, LogFormat, Logger};

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "judgeloop",
    about = "Write an article with one agent and refine it until another agent approves",
    version,
    author
)]
struct Cli {
    /// The topic for the article, e.g. "write me a 1000 word Medium article about
    /// how to use the LLM as a judge pattern without sounding like an LLM wrote it"
    topic: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let settings = Settings::load(&working_dir)?;

    init_tracing(&settings.log_level, settings.log_format);

    let logger = match settings.log_file {
        Some(ref path) => Logger::with_file(settings.log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(settings.log_format),
    };
    let logger = Arc::new(logger);

    let writer_agent = create_agent(settings.writer.agent_type, settings.writer.binary.clone());
    let critic_agent = create_agent(settings.critic.agent_type, settings.critic.binary.clone());

    if !writer_agent.is_available().await {
        anyhow::bail!(
            "Writer agent '{}' is not available. Make sure it's installed and in PATH.",
            writer_agent.name()
        );
    }
    if !critic_agent.is_available().await {
        anyhow::bail!(
            "Critic agent '{}' is not available. Make sure it's installed and in PATH.",
            critic_agent.name()
        );
    }

    let writer = AgentWriter::new(
        writer_agent.as_ref(),
        settings.writer.agent_config(&working_dir),
    )
    .with_output_callback(stream_to_logger(logger.clone(), AgentRole::Writer));
    let critic = CriticEvaluator::new(
        critic_agent.as_ref(),
        settings.critic.agent_config(&working_dir),
    )
    .with_output_callback(stream_to_logger(logger.clone(), AgentRole::Critic));

    let runner = LoopRunner::new(
        &writer,
        &critic,
        ArtifactPersister::new(settings.output_dir.clone()),
        logger,
    )
    .with_agent_names(writer_agent.name(), critic_agent.name());

    let outcome = runner
        .run(RunState::new(cli.topic, settings.max_attempts))
        .await?;

    if settings.log_format == LogFormat::Json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    eprintln!();
    match outcome {
        RunOutcome::Approved(summary) => {
            eprintln!("{}", "=== APPROVED ===".bright_green().bold());
            eprintln!("Attempts: {}", summary.attempts);
        }
        RunOutcome::MaxAttemptsReached(summary) => {
            eprintln!("{}", "=== MAX ATTEMPTS REACHED ===".bright_yellow().bold());
            eprintln!(
                "Reached maximum attempts ({}). Saved the latest version of the article.",
                summary.attempts
            );
            if !summary.feedback.is_empty() {
                eprintln!("Last feedback: {}", summary.feedback);
            }
        }
    }
    eprintln!("Duration: {:.1}s", outcome.total_duration_secs());
    eprintln!("Final article saved to: {}", outcome.artifact().display());
}
