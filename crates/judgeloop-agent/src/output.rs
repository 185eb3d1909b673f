use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Which stream a line of agent output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Stdout,
    Stderr,
}

/// Callback invoked for every line the agent prints while it runs
pub type OutputCallback = Arc<dyn Fn(&str, OutputType) + Send + Sync>;

/// Output captured from an agent execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Combined stdout output
    pub stdout: String,
    /// Combined stderr output
    pub stderr: String,
    /// Exit code from the process
    pub exit_code: i32,
    /// Duration of execution
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl AgentOutput {
    pub fn new(stdout: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            duration,
        }
    }

    /// Check if the agent exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Short description of a failed run, preferring the last stderr line
    pub fn failure_summary(&self) -> String {
        match self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("exit code {}: {}", self.exit_code, line.trim()),
            None => format!("exit code {}", self.exit_code),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_summary_uses_last_stderr_line() {
        let output = AgentOutput::new(
            String::new(),
            "warming up\nerror: rate limited\n\n".to_string(),
            1,
            Duration::from_secs(2),
        );
        assert!(!output.success());
        assert_eq!(output.failure_summary(), "exit code 1: error: rate limited");
    }

    #[test]
    fn test_failure_summary_without_stderr() {
        let output = AgentOutput::new("draft".to_string(), String::new(), 3, Duration::ZERO);
        assert_eq!(output.failure_summary(), "exit code 3");
    }

    #[test]
    fn test_duration_serializes_as_seconds() {
        let output = AgentOutput::new(
            "ok".to_string(),
            String::new(),
            0,
            Duration::from_millis(1500),
        );
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["duration"], 1.5);
    }
}
