use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const RULE_WIDTH: usize = 69;

/// Role of the agent producing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Writer,
    Critic,
}

/// Type of output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    Stdout,
    Stderr,
}

/// Structured log events for the generate/critique loop.
///
/// Attempt numbers are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        topic: String,
        max_attempts: usize,
        writer: String,
        critic: String,
    },
    AttemptStarted {
        attempt: usize,
        max_attempts: usize,
    },
    DraftGenerated {
        attempt: usize,
        chars: usize,
        duration_secs: f64,
    },
    /// Streaming output line from an agent
    AgentStreamLine {
        role: AgentRole,
        stream: StreamType,
        line: String,
    },
    EvaluationStarted {
        attempt: usize,
    },
    VerdictReceived {
        attempt: usize,
        score: String,
        feedback: String,
        duration_secs: f64,
    },
    RunApproved {
        attempts: usize,
        duration_secs: f64,
    },
    MaxAttemptsReached {
        attempts: usize,
    },
    ArtifactSaved {
        path: PathBuf,
        bytes: usize,
    },
    ErrorEncountered {
        attempt: usize,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for run events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger that also appends JSON lines to `log_path`
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RunStarted {
                topic,
                max_attempts,
                writer,
                critic,
            } => {
                let rule = "─".repeat(RULE_WIDTH);
                let _ = writeln!(stderr);
                let _ = writeln!(stderr, "{}", format!("╭{}╮", rule).bright_blue());
                let _ = writeln!(
                    stderr,
                    "{}  {}",
                    "│".bright_blue(),
                    "judgeloop".bold().bright_white()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Topic:".dimmed(),
                    Self::truncate(topic, 60).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {} / {} {}  {} {}",
                    "│".bright_blue(),
                    "Writer:".dimmed(),
                    writer,
                    "Critic:".dimmed(),
                    critic,
                    "Attempts:".dimmed(),
                    max_attempts
                );
                let _ = writeln!(stderr, "{}", format!("╰{}╯", rule).bright_blue());
                let _ = writeln!(stderr);
            }
            LogEvent::AttemptStarted {
                attempt,
                max_attempts,
            } => {
                let header = format!("─ Attempt {}/{} ", attempt, max_attempts);
                let padding = "─".repeat(RULE_WIDTH.saturating_sub(header.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    header.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "WRITER".bright_cyan().bold()
                );
            }
            LogEvent::DraftGenerated {
                chars,
                duration_secs,
                ..
            } => {
                if *chars == 0 {
                    let _ = writeln!(
                        stderr,
                        "    {} Empty draft ({:.1}s)",
                        "!".bright_yellow(),
                        duration_secs
                    );
                } else {
                    let _ = writeln!(
                        stderr,
                        "    {} Draft generated: {} chars ({:.1}s)",
                        "✓".bright_green(),
                        chars,
                        duration_secs
                    );
                }
                let _ = writeln!(stderr);
            }
            LogEvent::EvaluationStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "CRITIC".bright_magenta().bold()
                );
            }
            LogEvent::VerdictReceived {
                score, feedback, ..
            } => {
                let styled_score = match score.as_str() {
                    "pass" => format!("✓ Score: {}", score).bright_green().to_string(),
                    "fail" => format!("✗ Score: {}", score).bright_red().to_string(),
                    _ => format!("→ Score: {}", score).bright_yellow().to_string(),
                };
                let _ = writeln!(stderr, "    {}", styled_score);
                if !feedback.is_empty() {
                    let _ = writeln!(stderr, "    {} {}", "Feedback:".dimmed(), feedback);
                }
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    format!("└{}┘", "─".repeat(RULE_WIDTH)).bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::RunApproved { .. } => {
                let _ = writeln!(
                    stderr,
                    "{} Draft approved by the critic",
                    "✓".bright_green()
                );
            }
            LogEvent::MaxAttemptsReached { attempts } => {
                let _ = writeln!(
                    stderr,
                    "{} Maximum attempts reached ({}). Saving the latest draft.",
                    "⚠".bright_yellow(),
                    attempts
                );
            }
            LogEvent::ArtifactSaved { path, .. } => {
                let _ = writeln!(
                    stderr,
                    "{} Final draft saved to: {}",
                    "→".bright_blue(),
                    path.display().to_string().bold()
                );
            }
            LogEvent::ErrorEncountered { attempt, error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Error in attempt {}: {}",
                    "✗".bright_red(),
                    attempt,
                    error.bright_red()
                );
            }
            LogEvent::AgentStreamLine { line, stream, .. } => {
                let prefix = "    │".dimmed();
                let styled_line = match stream {
                    StreamType::Stdout => line.normal(),
                    StreamType::Stderr => line.dimmed(),
                };
                let _ = writeln!(stderr, "{} {}", prefix, styled_line);
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let _ = writeln!(std::io::stderr(), "{}", Self::compact_line(event));
    }

    fn compact_line(event: &LogEvent) -> String {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        match event {
            LogEvent::RunStarted { max_attempts, .. } => {
                format!("[{}] run:start max={}", timestamp, max_attempts)
            }
            LogEvent::AttemptStarted { attempt, .. } => {
                format!("[{}] writer:start:{}", timestamp, attempt)
            }
            LogEvent::DraftGenerated {
                attempt,
                chars,
                duration_secs,
            } => format!(
                "[{}] writer:done:{} {}c {:.1}s",
                timestamp, attempt, chars, duration_secs
            ),
            LogEvent::EvaluationStarted { attempt } => {
                format!("[{}] critic:start:{}", timestamp, attempt)
            }
            LogEvent::VerdictReceived {
                attempt,
                score,
                feedback,
                ..
            } => format!(
                "[{}] critic:done:{} {} {}",
                timestamp, attempt, score, feedback
            ),
            LogEvent::RunApproved {
                attempts,
                duration_secs,
            } => format!(
                "[{}] run:approved:{} {:.1}s",
                timestamp, attempts, duration_secs
            ),
            LogEvent::MaxAttemptsReached { attempts } => {
                format!("[{}] run:limit:{}", timestamp, attempts)
            }
            LogEvent::ArtifactSaved { path, bytes } => {
                format!("[{}] artifact:{} {}b", timestamp, path.display(), bytes)
            }
            LogEvent::ErrorEncountered { attempt, error } => {
                format!("[{}] error:{}:{}", timestamp, attempt, error)
            }
            LogEvent::AgentStreamLine { role, line, .. } => {
                let role_str = match role {
                    AgentRole::Writer => "W",
                    AgentRole::Critic => "C",
                };
                format!("[{}] {}:{}", timestamp, role_str, line)
            }
        }
    }

    fn truncate(s: &str, max_chars: usize) -> String {
        if s.chars().count() > max_chars {
            let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        }
    }
}
