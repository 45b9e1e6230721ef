//! Configuration for aichat.
//!
//! [`AiChatConfig`] describes everything a [`SecretaryCoordinator`] needs: where data lives,
//! which agent plans, which agents discuss, and the numeric policy knobs. Build it once at
//! process start and pass it by reference; nothing in the crate looks agents up globally.
//! There is no config-file parser, construct it however you like or start from
//! [`AiChatConfig::from_env`].
//!
//! # Example
//!
//! ```rust
//! use aichat::config::{AgentSpec, AiChatConfig, Provider};
//! use std::path::PathBuf;
//!
//! let mut config = AiChatConfig::default();
//! config.data_dir = PathBuf::from("/tmp/aichat");
//! config.discussion_group.push(AgentSpec::new(
//!     "Local-llama",
//!     "devil's advocate",
//!     Provider::Compatible { base_url: "http://localhost:8080".into() },
//!     "llama-3.1-8b",
//!     "unused",
//! ));
//! assert_eq!(config.reports_dir(), PathBuf::from("/tmp/aichat/reports"));
//! ```
//!
//! [`SecretaryCoordinator`]: crate::secretary::SecretaryCoordinator

use crate::agent::{Agent, InvocationMode, DEFAULT_REMOTE_TIMEOUT};
use crate::client_wrapper::ClientWrapper;
use crate::clients::grok::GrokClient;
use crate::clients::openai::OpenAIClient;
use crate::discussion::{CarryOver, DEFAULT_CONVERGENCE_THRESHOLD};
use crate::tools::code_runner::DEFAULT_EXECUTION_TIMEOUT;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the planner's (xAI) key.
pub const SECRETARY_KEY_ENV: &str = "XAI_API_KEY";
/// Environment variable holding the discussion member's (OpenAI) key.
pub const DISCUSSION_KEY_ENV: &str = "OPENAI_API_KEY";

/// Which remote API an agent talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Grok,
    /// Any OpenAI compatible chat endpoint.
    Compatible { base_url: String },
}

/// Declarative description of one agent.
#[derive(Clone)]
pub struct AgentSpec {
    pub name: String,
    pub specialty: String,
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    pub mode: InvocationMode,
}

impl fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSpec")
            .field("name", &self.name)
            .field("specialty", &self.specialty)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("mode", &self.mode)
            .finish()
    }
}

impl AgentSpec {
    /// A concurrent-mode spec.
    pub fn new(
        name: impl Into<String>,
        specialty: impl Into<String>,
        provider: Provider,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
            provider,
            model: model.into(),
            api_key: api_key.into(),
            mode: InvocationMode::Concurrent,
        }
    }

    pub fn with_mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build_client(&self) -> Arc<dyn ClientWrapper> {
        match &self.provider {
            Provider::OpenAI => Arc::new(OpenAIClient::new_with_model_string(
                &self.api_key,
                &self.model,
            )),
            Provider::Grok => Arc::new(GrokClient::new_with_model_str(&self.api_key, &self.model)),
            Provider::Compatible { base_url } => Arc::new(OpenAIClient::new_with_base_url(
                &self.api_key,
                &self.model,
                base_url,
            )),
        }
    }

    /// Build the agent with a real client and the given remote timeout.
    pub fn build_agent(&self, timeout: Duration) -> Agent {
        Agent::new(self.name.as_str(), self.specialty.as_str(), self.build_client())
            .with_mode(self.mode)
            .with_timeout(timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    MissingEnv(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingEnv(var) => {
                write!(f, "environment variable {} is not set", var)
            }
        }
    }
}

impl Error for ConfigError {}

pub struct AiChatConfig {
    /// Root for `logs.txt`, `scripts/`, `reports/` and `knowledge/`.
    pub data_dir: PathBuf,
    /// The planning agent.
    pub secretary: AgentSpec,
    /// Discussion members, in enumeration order.
    pub discussion_group: Vec<AgentSpec>,
    pub default_rounds: usize,
    /// Rounds used when feedback carries a low rating.
    pub escalated_rounds: usize,
    /// Ratings at or below this, on a five-point scale, count as low. `N/M` ratings are rescaled.
    pub low_rating_threshold: u32,
    pub convergence_threshold: f32,
    pub carry_over: CarryOver,
    pub remote_timeout: Duration,
    pub execution_timeout: Duration,
}

impl Default for AiChatConfig {
    /// Data under `"data"`, a Grok `grok-2-1212` secretary with an empty key and no discussion
    /// members.
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            secretary: AgentSpec::new("Secretary", "planning", Provider::Grok, "grok-2-1212", "")
                .with_mode(InvocationMode::Sequential),
            discussion_group: Vec::new(),
            default_rounds: 2,
            escalated_rounds: 3,
            low_rating_threshold: 3,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            carry_over: CarryOver::LastResponse,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }
}

impl AiChatConfig {
    /// Defaults plus keys from the environment: `XAI_API_KEY` for the secretary and
    /// `OPENAI_API_KEY` for the single `OpenAI-o3-mini` discussion member. `AICHAT_DATA_DIR`
    /// overrides the data directory when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.secretary.api_key = required_env(SECRETARY_KEY_ENV)?;
        config.discussion_group.push(AgentSpec::new(
            "OpenAI-o3-mini",
            "coding and logical reasoning",
            Provider::OpenAI,
            "o3-mini",
            required_env(DISCUSSION_KEY_ENV)?,
        ));
        if let Ok(dir) = std::env::var("AICHAT_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("logs.txt")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.data_dir.join("scripts")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    pub fn knowledge_dir(&self) -> PathBuf {
        self.data_dir.join("knowledge")
    }
}

fn required_env(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(var.to_string())),
    }
}
