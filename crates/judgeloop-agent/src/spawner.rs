use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::{AgentConfig, AgentError, AgentOutput, OutputCallback, OutputType};

/// Utility for spawning agent processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn `binary`, feed `input` on stdin, and forward each output line to
    /// `on_output` as it arrives.
    ///
    /// Prompts go through stdin rather than argv: a transcript that has grown
    /// over several rounds easily exceeds the per-argument limit of `execve`.
    pub async fn spawn(
        binary: &Path,
        args: &[&str],
        input: Option<&str>,
        config: &AgentConfig,
        on_output: Option<OutputCallback>,
    ) -> Result<AgentOutput, AgentError> {
        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            arg_count = args.len(),
            input_len = input.map_or(0, str::len),
            working_dir = %config.working_dir.display(),
            "Spawning agent process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AgentError::NotFound(binary.display().to_string()),
            _ => AgentError::SpawnFailed(e),
        })?;

        // Written from its own task so a child that echoes output before it
        // has consumed all of stdin cannot deadlock against our reads
        let writer = match input {
            Some(input) => {
                let stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| AgentError::ExecutionFailed("stdin not captured".into()))?;
                Some(write_input(stdin, input.to_owned()))
            }
            None => None,
        };

        let stdout_handle = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::ExecutionFailed("stdout not captured".into()))?;
        let stderr_handle = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::ExecutionFailed("stderr not captured".into()))?;

        let mut stdout_reader = BufReader::new(stdout_handle).lines();
        let mut stderr_reader = BufReader::new(stderr_handle).lines();

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut stdout_open = true;
        let mut stderr_open = true;

        // Read both streams until each reports EOF
        while stdout_open || stderr_open {
            tokio::select! {
                biased;

                result = stdout_reader.next_line(), if stdout_open => {
                    match result {
                        Ok(Some(line)) => {
                            trace!(line = %line, "stdout");
                            emit(&on_output, &line, OutputType::Stdout);
                            append_line(&mut stdout, &line);
                        }
                        Ok(None) => stdout_open = false,
                        Err(e) => {
                            return Err(AgentError::ExecutionFailed(format!(
                                "Failed to read stdout: {}",
                                e
                            )));
                        }
                    }
                }
                result = stderr_reader.next_line(), if stderr_open => {
                    match result {
                        Ok(Some(line)) => {
                            trace!(line = %line, "stderr");
                            emit(&on_output, &line, OutputType::Stderr);
                            append_line(&mut stderr, &line);
                        }
                        Ok(None) => stderr_open = false,
                        Err(e) => {
                            return Err(AgentError::ExecutionFailed(format!(
                                "Failed to read stderr: {}",
                                e
                            )));
                        }
                    }
                }
            }
        }

        if let Some(writer) = writer {
            finish_input(writer).await?;
        }

        let status = child.wait().await?;
        let duration = start.elapsed();

        debug!(
            exit_code = status.code().unwrap_or(-1),
            duration_ms = duration.as_millis(),
            "Agent process completed"
        );

        Ok(AgentOutput::new(
            stdout,
            stderr,
            status.code().unwrap_or(-1),
            duration,
        ))
    }
}

fn write_input(
    mut stdin: tokio::process::ChildStdin,
    input: String,
) -> JoinHandle<std::io::Result<()>> {
    tokio::spawn(async move {
        stdin.write_all(input.as_bytes()).await?;
        // Dropping stdin on return closes the pipe, which ends the prompt
        stdin.shutdown().await
    })
}

async fn finish_input(writer: JoinHandle<std::io::Result<()>>) -> Result<(), AgentError> {
    match writer.await {
        Ok(Ok(())) => Ok(()),
        // The agent exited without reading everything; its exit status says why
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("Agent closed stdin before the whole prompt was written");
            Ok(())
        }
        Ok(Err(e)) => Err(AgentError::PromptDelivery(e)),
        Err(e) => Err(AgentError::ExecutionFailed(format!(
            "Prompt writer task failed: {}",
            e
        ))),
    }
}

fn emit(on_output: &Option<OutputCallback>, line: &str, output_type: OutputType) {
    if let Some(callback) = on_output {
        callback(line, output_type);
    }
}

fn append_line(buffer: &mut String, line: &str) {
    if !buffer.is_empty() {
        buffer.push('\n');
    }
    buffer.push_str(line);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn config() -> AgentConfig {
        AgentConfig::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_spawn_captures_both_streams() {
        let output = ProcessSpawner::spawn(
            &sh(),
            &["-c", "echo first; echo second; echo oops 1>&2"],
            None,
            &config(),
            None,
        )
        .await
        .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "first\nsecond");
        assert_eq!(output.stderr, "oops");
    }

    #[tokio::test]
    async fn test_spawn_reports_exit_code_and_env() {
        let config = config().with_env("JUDGELOOP_TEST_VALUE", "42");
        let output = ProcessSpawner::spawn(
            &sh(),
            &["-c", "echo $JUDGELOOP_TEST_VALUE; exit 3"],
            None,
            &config,
            None,
        )
        .await
        .unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout, "42");
    }

    #[tokio::test]
    async fn test_spawn_streams_lines_to_callback() {
        let seen: Arc<Mutex<Vec<(String, OutputType)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: OutputCallback = Arc::new(move |line: &str, output_type: OutputType| {
            sink.lock().unwrap().push((line.to_string(), output_type));
        });

        ProcessSpawner::spawn(&sh(), &["-c", "echo a; echo b"], None, &config(), Some(callback))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("a".to_string(), OutputType::Stdout),
                ("b".to_string(), OutputType::Stdout)
            ]
        );
    }

    #[tokio::test]
    async fn test_spawn_delivers_input_larger_than_an_argument() {
        // Well past the 128 KiB a single execve argument may hold
        let input = (0..4000)
            .map(|i| format!("line {} {}", i, "word ".repeat(10)))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(input.len() > 200 * 1024);

        let output = ProcessSpawner::spawn(Path::new("/bin/cat"), &[], Some(&input), &config(), None)
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.len(), input.len());
        assert_eq!(output.stdout, input);
    }

    #[tokio::test]
    async fn test_spawn_without_input_sees_closed_stdin() {
        let output = ProcessSpawner::spawn(&sh(), &["-c", "cat; echo done"], None, &config(), None)
            .await
            .unwrap();

        assert_eq!(output.stdout, "done");
    }

    #[tokio::test]
    async fn test_spawn_tolerates_agent_ignoring_input() {
        let input = "x".repeat(512 * 1024);
        let output = ProcessSpawner::spawn(&sh(), &["-c", "exit 4"], Some(&input), &config(), None)
            .await
            .unwrap();

        assert_eq!(output.exit_code, 4);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_abandoned_spawn_kills_agent() {
        use std::time::Duration;

        let pid: Arc<Mutex<Option<u32>>> = Arc::new(Mutex::new(None));
        let sink = pid.clone();
        let callback: OutputCallback = Arc::new(move |line: &str, _: OutputType| {
            if let Ok(parsed) = line.trim().parse() {
                *sink.lock().unwrap() = Some(parsed);
            }
        });

        let program = sh();
        let cfg = config();
        let run = ProcessSpawner::spawn(
            &program,
            &["-c", "echo $$; exec sleep 30"],
            None,
            &cfg,
            Some(callback),
        );
        assert!(tokio::time::timeout(Duration::from_millis(500), run)
            .await
            .is_err());

        let pid = pid.lock().unwrap().take().expect("agent printed its pid");
        let mut alive = true;
        for _ in 0..50 {
            match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
                Err(_) => {
                    alive = false;
                    break;
                }
                Ok(stat) if stat.contains(") Z") => {
                    alive = false;
                    break;
                }
                Ok(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        assert!(!alive, "agent process {} outlived its spawn", pid);
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_is_not_found() {
        let result = ProcessSpawner::spawn(
            Path::new("/nonexistent/judgeloop-agent-binary"),
            &[],
            None,
            &config(),
            None,
        )
        .await;

        assert!(matches!(result, Err(AgentError::NotFound(_))));
    }
}
