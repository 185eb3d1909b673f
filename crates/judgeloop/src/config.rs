//! Configuration file support for judgeloop.
//!
//! Settings come from `judgeloop.toml` in the working directory, the file named
//! by `JUDGELOOP_CONFIG`, or `judgeloop/config.toml` in the user config
//! directory, in that order. Everything is optional.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use judgeloop_agent::{AgentConfig, AgentType};
use judgeloop_core::DEFAULT_MAX_ATTEMPTS;
use judgeloop_logging::LogFormat;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "judgeloop.toml";
/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "JUDGELOOP_CONFIG";

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Configuration as written in `judgeloop.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Global default agent (applies to both writer and critic)
    pub agent: Option<String>,
    /// Global default model (applies to both writer and critic)
    pub model: Option<String>,
    /// Maximum generate/evaluate rounds
    pub max_attempts: Option<usize>,
    /// Directory the final draft is written to
    pub output_dir: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
    pub log_level: Option<String>,
    /// Append JSON-lines run events to this file
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub writer: RoleConfig,
    #[serde(default)]
    pub critic: RoleConfig,
}

/// Configuration for a specific role (writer or critic)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub agent: Option<String>,
    pub model: Option<String>,
    /// Path to the agent binary, if not on PATH
    pub binary: Option<PathBuf>,
    /// Extra environment for the agent process (credentials, endpoints)
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl ProjectConfig {
    /// Find and load the configuration for `working_dir`.
    ///
    /// Returns `Ok(None)` when no config file exists. A file named by
    /// `JUDGELOOP_CONFIG` must exist.
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let explicit = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        if let Some(ref path) = explicit {
            if !path.exists() {
                bail!(
                    "{} points to {}, which does not exist",
                    CONFIG_ENV_VAR,
                    path.display()
                );
            }
        }

        match Self::locate(working_dir, explicit) {
            Some(path) => Self::load_from(&path).map(Some),
            None => Ok(None),
        }
    }

    fn locate(working_dir: &Path, explicit: Option<PathBuf>) -> Option<PathBuf> {
        if explicit.is_some() {
            return explicit;
        }

        let local = working_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("judgeloop").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// Parse a config file; a file that exists but fails to parse is a hard error
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Priority: [writer].agent > global agent > None
    pub fn writer_agent(&self) -> Option<&str> {
        self.writer.agent.as_deref().or(self.agent.as_deref())
    }

    /// Priority: [writer].model > global model > None
    pub fn writer_model(&self) -> Option<&str> {
        self.writer.model.as_deref().or(self.model.as_deref())
    }

    /// Priority: [critic].agent > global agent > None
    pub fn critic_agent(&self) -> Option<&str> {
        self.critic.agent.as_deref().or(self.agent.as_deref())
    }

    /// Priority: [critic].model > global model > None
    pub fn critic_model(&self) -> Option<&str> {
        self.critic.model.as_deref().or(self.model.as_deref())
    }
}

/// Fully resolved settings for one role
#[derive(Debug, Clone)]
pub struct RoleSettings {
    pub agent_type: AgentType,
    pub model: Option<String>,
    pub binary: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl RoleSettings {
    fn resolve(agent: Option<&str>, model: Option<&str>, role: &RoleConfig) -> Result<Self> {
        let agent_type = match agent {
            Some(name) => name.parse::<AgentType>().map_err(anyhow::Error::msg)?,
            None => AgentType::ClaudeCode,
        };

        Ok(Self {
            agent_type,
            model: model.map(String::from),
            binary: role.binary.clone(),
            env: role.env.clone(),
        })
    }

    pub fn agent_config(&self, working_dir: &Path) -> AgentConfig {
        let mut config = AgentConfig::new(working_dir.to_path_buf());
        if let Some(ref model) = self.model {
            config = config.with_model(model.clone());
        }
        for (key, value) in &self.env {
            config = config.with_env(key.clone(), value.clone());
        }
        config
    }
}

/// Settings value built once at startup and passed to everything that needs it
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_attempts: usize,
    pub output_dir: PathBuf,
    pub log_format: LogFormat,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub writer: RoleSettings,
    pub critic: RoleSettings,
}

impl Settings {
    /// Load the config file for `working_dir` and resolve it
    pub fn load(working_dir: &Path) -> Result<Self> {
        let config = ProjectConfig::load(working_dir)?;
        Self::resolve(config.unwrap_or_default(), working_dir)
    }

    pub fn resolve(config: ProjectConfig, working_dir: &Path) -> Result<Self> {
        let max_attempts = config.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }

        let writer = RoleSettings::resolve(config.writer_agent(), config.writer_model(), &config.writer)
            .context("Invalid [writer] agent")?;
        let critic = RoleSettings::resolve(config.critic_agent(), config.critic_model(), &config.critic)
            .context("Invalid [critic] agent")?;

        let output_dir = match config.output_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => working_dir.join(dir),
            None => working_dir.to_path_buf(),
        };
        let log_file = config.log_file.map(|path| {
            if path.is_absolute() {
                path
            } else {
                working_dir.join(path)
            }
        });

        Ok(Self {
            max_attempts,
            output_dir,
            log_format: config.log_format.unwrap_or_default(),
            log_level: config
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_file,
            writer,
            critic,
        })
    }
}
