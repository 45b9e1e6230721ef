//! The remote model seam.
//!
//! A [`ClientWrapper`] is a thin wrapper around one remote model endpoint. It takes a list of
//! [`Message`]s and returns the assistant's reply, or a [`RemoteCallError`]. It keeps no
//! conversation state: every agent invocation in this crate is a single-turn exchange, so the
//! caller passes the full prompt each time.
//!
//! Concrete providers live in [`crate::clients`]. Tests substitute their own implementations.

use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

/// Represents the possible roles for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    // set by the developer to steer the model's responses
    System,
    // a message sent by a human user (or app user)
    User,
    // lets the model know the content was generated as a response to a user message
    Assistant,
}

impl Role {
    /// Wire name used by OpenAI compatible chat endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Represents a generic message to be sent to a model.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Failure of a single remote model call.
///
/// Agents never let this escape into orchestration control flow; see
/// [`AgentReply`](crate::agent::AgentReply).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCallError {
    /// The request never produced an HTTP response (DNS, TLS, connection reset...).
    Transport(String),
    /// The provider answered with an error payload.
    Provider(String),
    /// The provider answered but the body could not be interpreted.
    MalformedResponse(String),
    /// The call did not finish within the agent's timeout.
    Timeout(Duration),
    /// The task driving the call died before producing a result.
    Aborted(String),
}

impl fmt::Display for RemoteCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCallError::Transport(msg) => write!(f, "transport error: {}", msg),
            RemoteCallError::Provider(msg) => write!(f, "provider error: {}", msg),
            RemoteCallError::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
            RemoteCallError::Timeout(after) => {
                write!(f, "timed out after {:.1}s", after.as_secs_f64())
            }
            RemoteCallError::Aborted(msg) => write!(f, "aborted: {}", msg),
        }
    }
}

impl Error for RemoteCallError {}

/// Trait defining the interface to a remote model endpoint.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Identifier of the model this client talks to (e.g. `"o3-mini"`).
    fn model_name(&self) -> &str;

    /// Send the messages to the model and return its reply.
    async fn send_message(&self, messages: &[Message]) -> Result<Message, RemoteCallError>;

    /// Usage reported by the *last* `send_message()` call, when the client tracks it.
    fn get_last_usage(&self) -> Option<TokenUsage> {
        self.usage_slot()
            .and_then(|slot| slot.lock().ok().and_then(|u| u.clone()))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // Clients that track TokenUsage override this with their own slot.
        None
    }
}
