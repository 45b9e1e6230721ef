//! # aichat
//!
//! aichat is an AI secretary that answers instructions by delegating to remote Large Language
//! Models. A planning agent decides per instruction whether to answer directly or to convene a
//! discussion group of other agents, runs any code the final answer contains, writes a dated
//! report, and remembers the result so the same instruction is never computed twice.
//!
//! The crate provides layered pieces, each usable on its own:
//!
//! * **Agents**: [`Agent`] binds a name and a specialty to one [`ClientWrapper`] endpoint. Remote
//!   failures come back as soft-failure replies, never as errors.
//! * **Discussion group**: [`discussion::DiscussionOrchestrator`] runs agents concurrently for a
//!   bounded number of rounds and stops early when their answers converge.
//! * **Knowledge base**: [`knowledge::ResultCache`] is a content-addressed store of finished runs.
//! * **Secretary**: [`SecretaryCoordinator`] ties planning, discussion, code execution,
//!   reporting and caching into one `process(instruction, feedback)` call.
//! * **Providers**: [`ClientWrapper`] is implemented for OpenAI, xAI Grok and any OpenAI
//!   compatible endpoint.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use aichat::config::AiChatConfig;
//! use aichat::SecretaryCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     aichat::init_logger();
//!
//!     // XAI_API_KEY drives the secretary, OPENAI_API_KEY the discussion group.
//!     let config = AiChatConfig::from_env()?;
//!     let secretary = SecretaryCoordinator::from_config(&config)?;
//!
//!     let result = secretary
//!         .handle("discuss the best way to deduplicate a large CSV", None)
//!         .await?;
//!     println!("{}", result.result_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Observability
//!
//! Diagnostics go through the [`log`] facade; call [`init_logger`] to route them to
//! `env_logger` under `RUST_LOG`. Every remote exchange is also appended to an interaction log
//! (see [`interaction_log`]), and structured callbacks are available through
//! [`event::EventHandler`].

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding aichat opt in to `RUST_LOG` driven diagnostics with this call; the
/// library itself never installs a logger.
///
/// ```rust
/// aichat::init_logger();
/// aichat::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `aichat` module.
pub mod aichat;

// Re-exporting key items for easier external access.
pub use aichat::agent;
pub use aichat::agent::{Agent, AgentReply, InvocationMode};
pub use aichat::client_wrapper;
pub use aichat::client_wrapper::{ClientWrapper, Message, RemoteCallError, Role, TokenUsage};
pub use aichat::clients;
pub use aichat::code_block;
pub use aichat::commands;
pub use aichat::config;
pub use aichat::config::AiChatConfig;
pub use aichat::convergence;
pub use aichat::discussion;
pub use aichat::event;
pub use aichat::event::{AgentEvent, DiscussionEvent, EventHandler, SecretaryEvent};
pub use aichat::interaction_log;
pub use aichat::knowledge;
pub use aichat::plan;
pub use aichat::secretary;
pub use aichat::secretary::{RunResult, SecretaryCoordinator, SecretaryError};
pub use aichat::tools;
pub use aichat::transcript;
pub use aichat::transcript::{Transcript, TranscriptSegment};
