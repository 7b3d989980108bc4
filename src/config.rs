//! Process configuration.
//!
//! Built once at startup and passed by reference. Values come from an optional
//! JSON file (`ESSAY_PIPELINE_CONFIG`, or `./config.json` when present) and are
//! overridden by environment variables:
//! - `OPENAI_API_KEY` - API key for the chat-completions provider (required)
//! - `OPENAI_API_BASE` - Provider base URL
//! - `LLM_MODEL` - Model used by both stages
//! - `AGENT_ROLE` - `pipeline`, `essay-writer` or `style-editor`
//! - `HOST` / `PORT` / `PUBLIC_URL` - Listener and advertised card URL
//! - `STYLE_EDITOR_URL` - Remote style editor for the essay-writer role
//! - `REMOTE_TIMEOUT_SECS`, `LLM_TIMEOUT_SECS`, `TASK_RETENTION_SECS`
//! - `ESSAY_MAX_TOKENS`, `ESSAY_TEMPERATURE`, `EDIT_MAX_TOKENS`, `EDIT_TEMPERATURE`

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::GenerationOptions;
use crate::pipeline::Skill;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Which agent this process runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    /// Both stages in-process.
    Pipeline,
    /// Essay stage here, style editing delegated to a remote agent.
    EssayWriter,
    /// Style editing only.
    StyleEditor,
}

impl AgentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Pipeline => "pipeline",
            AgentRole::EssayWriter => "essay-writer",
            AgentRole::StyleEditor => "style-editor",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            AgentRole::Pipeline => 8000,
            AgentRole::EssayWriter => 8001,
            AgentRole::StyleEditor => 8002,
        }
    }

    /// Skills advertised by this role; the first one is the default.
    pub fn skills(self) -> Vec<Skill> {
        match self {
            AgentRole::Pipeline => vec![Skill::WriteEssay, Skill::EditStyle],
            AgentRole::EssayWriter => vec![Skill::WriteEssay],
            AgentRole::StyleEditor => vec![Skill::EditStyle],
        }
    }

    pub fn default_skill(self) -> Skill {
        match self {
            AgentRole::StyleEditor => Skill::EditStyle,
            _ => Skill::WriteEssay,
        }
    }
}

impl FromStr for AgentRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pipeline" => Ok(AgentRole::Pipeline),
            "essay-writer" | "essay_writer" => Ok(AgentRole::EssayWriter),
            "style-editor" | "style_editor" => Ok(AgentRole::StyleEditor),
            other => Err(ConfigError::InvalidValue {
                name: "AGENT_ROLE",
                value: other.to_string(),
            }),
        }
    }
}

/// Optional on-disk configuration. Every field may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub role: Option<AgentRole>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub style_editor_url: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    pub role: AgentRole,
    pub host: String,
    pub port: u16,
    /// URL published in the agent card.
    pub public_url: String,
    pub style_editor_url: Option<String>,
    /// Bound on the remote style-edit call.
    pub remote_timeout: Duration,
    /// Request timeout of the LLM client.
    pub llm_timeout: Duration,
    /// How long finished tasks stay queryable.
    pub task_retention: Duration,
    pub essay: GenerationOptions,
    pub edit: GenerationOptions,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match std::env::var("ESSAY_PIPELINE_CONFIG") {
            Ok(path) => FileConfig::load(Path::new(&path))?,
            Err(_) => {
                let default_path = Path::new("config.json");
                if default_path.exists() {
                    FileConfig::load(default_path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Self::from_sources(file, |name| std::env::var(name).ok())
    }

    /// Merge a file config with an environment lookup. Environment wins.
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let api_key = var("OPENAI_API_KEY")
            .or(file.openai_api_key)
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        if !api_key.starts_with("sk-") {
            tracing::warn!("OPENAI_API_KEY does not look like an OpenAI key");
        }

        let role = match var("AGENT_ROLE") {
            Some(v) => v.parse()?,
            None => file.role.unwrap_or(AgentRole::Pipeline),
        };

        let port = match var("PORT") {
            Some(v) => parse_value("PORT", &v)?,
            None => file.port.unwrap_or_else(|| role.default_port()),
        };

        let public_url = var("PUBLIC_URL")
            .or(file.public_url)
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let essay = GenerationOptions {
            max_output_tokens: parse_or("ESSAY_MAX_TOKENS", var("ESSAY_MAX_TOKENS"), 1000)?,
            temperature: parse_or("ESSAY_TEMPERATURE", var("ESSAY_TEMPERATURE"), 0.7)?,
        };
        let edit = GenerationOptions {
            max_output_tokens: parse_or("EDIT_MAX_TOKENS", var("EDIT_MAX_TOKENS"), 1000)?,
            temperature: parse_or("EDIT_TEMPERATURE", var("EDIT_TEMPERATURE"), 0.5)?,
        };
        validate_options(&essay, "ESSAY_MAX_TOKENS", "ESSAY_TEMPERATURE")?;
        validate_options(&edit, "EDIT_MAX_TOKENS", "EDIT_TEMPERATURE")?;

        Ok(Self {
            api_key,
            api_base_url: var("OPENAI_API_BASE")
                .or(file.api_base_url)
                .unwrap_or_else(|| crate::llm::DEFAULT_API_BASE.to_string()),
            model: var("LLM_MODEL")
                .or(file.model)
                .unwrap_or_else(|| "gpt-4".to_string()),
            role,
            host: var("HOST")
                .or(file.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            public_url,
            style_editor_url: var("STYLE_EDITOR_URL").or(file.style_editor_url),
            remote_timeout: Duration::from_secs(parse_or(
                "REMOTE_TIMEOUT_SECS",
                var("REMOTE_TIMEOUT_SECS"),
                60,
            )?),
            llm_timeout: Duration::from_secs(parse_or(
                "LLM_TIMEOUT_SECS",
                var("LLM_TIMEOUT_SECS"),
                120,
            )?),
            task_retention: Duration::from_secs(parse_or(
                "TASK_RETENTION_SECS",
                var("TASK_RETENTION_SECS"),
                3600,
            )?),
            essay,
            edit,
        })
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse_value(name, &v),
        None => Ok(default),
    }
}

fn validate_options(
    options: &GenerationOptions,
    tokens_name: &'static str,
    temperature_name: &'static str,
) -> Result<(), ConfigError> {
    if options.max_output_tokens == 0 {
        return Err(ConfigError::InvalidValue {
            name: tokens_name,
            value: "0".to_string(),
        });
    }
    if !(0.0..=2.0).contains(&options.temperature) {
        return Err(ConfigError::InvalidValue {
            name: temperature_name,
            value: options.temperature.to_string(),
        });
    }
    Ok(())
}
