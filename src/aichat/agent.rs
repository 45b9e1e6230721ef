//! Agent System
//!
//! An [`Agent`] is one named remote model identity: a name, a free-text specialty that is
//! embedded into discussion prompts, an [`InvocationMode`], and exactly one
//! [`ClientWrapper`] endpoint.
//!
//! Agents are built once at process start and shared read-only (`Arc<Agent>`) by the
//! secretary and the discussion group. Invoking one never mutates it.
//!
//! # Soft failures
//!
//! [`Agent::invoke`] never returns an error. A failed remote call comes back as an
//! [`AgentReply`] whose `outcome` is `Err(RemoteCallError)`; [`AgentReply::text`] renders it as
//! `"<agent-name> invocation failed: <cause>"`, which is what lands in transcripts. Both
//! outcomes are written to the interaction log the same way.
//!
//! # Example
//!
//! ```rust,no_run
//! use aichat::Agent;
//! use aichat::clients::openai::OpenAIClient;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async {
//! let agent = Agent::new(
//!     "OpenAI-o3-mini",
//!     "coding and logical reasoning",
//!     Arc::new(OpenAIClient::new_with_model_string("key", "o3-mini")),
//! )
//! .with_timeout(Duration::from_secs(60));
//!
//! let reply = agent.invoke("How should we shard this table?").await;
//! println!("{}", reply.text());
//! # };
//! ```

use crate::client_wrapper::{ClientWrapper, Message, RemoteCallError};
use crate::event::{AgentEvent, EventHandler};
use crate::interaction_log::{InteractionLogger, InteractionRecord, NoopInteractionLog};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default per-call timeout for remote invocations.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(120);

/// How a discussion round schedules an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Awaited in place, one after another, inside the round.
    Sequential,
    /// Spawned onto the runtime so it overlaps with every other agent in the round.
    Concurrent,
}

/// Outcome of one invocation, tagged so callers can tell failure from content without
/// string matching.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub agent_name: String,
    pub outcome: Result<String, RemoteCallError>,
}

impl AgentReply {
    pub fn answered(agent_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            outcome: Ok(text.into()),
        }
    }

    pub fn failed(agent_name: impl Into<String>, cause: RemoteCallError) -> Self {
        Self {
            agent_name: agent_name.into(),
            outcome: Err(cause),
        }
    }

    /// The externally observable text: the answer, or the soft-failure sentence.
    pub fn text(&self) -> String {
        match &self.outcome {
            Ok(text) => text.clone(),
            Err(cause) => format!("{} invocation failed: {}", self.agent_name, cause),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn failure(&self) -> Option<&RemoteCallError> {
        self.outcome.as_ref().err()
    }
}

/// A named model identity bound to a single remote endpoint.
pub struct Agent {
    /// Unique name, used in prompts, transcripts and logs.
    pub name: String,
    /// Free-form description of the agent's strengths, embedded into discussion prompts.
    pub specialty: String,
    pub mode: InvocationMode,
    client: Arc<dyn ClientWrapper>,
    timeout: Duration,
    interaction_log: Arc<dyn InteractionLogger>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl Agent {
    /// Create a concurrent-mode agent with the default timeout and no interaction log.
    pub fn new(
        name: impl Into<String>,
        specialty: impl Into<String>,
        client: Arc<dyn ClientWrapper>,
    ) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
            mode: InvocationMode::Concurrent,
            client,
            timeout: DEFAULT_REMOTE_TIMEOUT,
            interaction_log: Arc::new(NoopInteractionLog),
            event_handler: None,
        }
    }

    pub fn with_mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interaction_log(mut self, log: Arc<dyn InteractionLogger>) -> Self {
        self.interaction_log = log;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_agent_event(&event).await;
        }
    }

    /// Send `prompt` as a single user message and wait for the reply.
    ///
    /// Safe to run concurrently with other invocations of this or any other agent.
    /// Never fails: transport errors, provider errors and timeouts all come back as a
    /// failed [`AgentReply`].
    pub async fn invoke(&self, prompt: &str) -> AgentReply {
        let started = Instant::now();
        self.emit(AgentEvent::InvocationStarted {
            agent_name: self.name.clone(),
            prompt_preview: preview(prompt, 120),
        })
        .await;

        let messages = [Message::user(prompt)];
        let outcome =
            match tokio::time::timeout(self.timeout, self.client.send_message(&messages)).await {
                Ok(Ok(reply)) => Ok(reply.content),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(RemoteCallError::Timeout(self.timeout)),
            };
        let reply = AgentReply {
            agent_name: self.name.clone(),
            outcome,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let text = reply.text();
        self.interaction_log
            .append(&InteractionRecord::now(prompt, self.name.as_str(), text.as_str()));

        match &reply.outcome {
            Ok(content) => {
                log::debug!(
                    "agent {} ({}) answered in {}ms ({} chars)",
                    self.name,
                    self.model_name(),
                    elapsed_ms,
                    content.len()
                );
                self.emit(AgentEvent::InvocationCompleted {
                    agent_name: self.name.clone(),
                    response_length: content.len(),
                    elapsed_ms,
                })
                .await;
            }
            Err(cause) => {
                log::warn!("{}", text);
                self.emit(AgentEvent::InvocationFailed {
                    agent_name: self.name.clone(),
                    error: cause.to_string(),
                    elapsed_ms,
                })
                .await;
            }
        }

        reply
    }

    /// Blocking form of [`Agent::invoke`] for callers that are not running inside an async
    /// runtime (for example a synchronous UI thread).
    ///
    /// Drives the call on a private current-thread runtime. Calling this from within a tokio
    /// runtime panics, as any nested `block_on` would; use [`Agent::invoke`] there.
    pub fn invoke_blocking(&self, prompt: &str) -> AgentReply {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.invoke(prompt)),
            Err(e) => {
                let reply = AgentReply::failed(
                    self.name.as_str(),
                    RemoteCallError::Transport(format!("could not start runtime: {}", e)),
                );
                self.interaction_log.append(&InteractionRecord::now(
                    prompt,
                    self.name.as_str(),
                    reply.text(),
                ));
                reply
            }
        }
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
