//! Callback-based observability for agents, discussions and the secretary.
//!
//! Implement [`EventHandler`] to receive real-time notifications about:
//!
//! - **Remote invocations**: every agent call, its outcome and latency
//! - **Discussion rounds**: round boundaries, per-agent responses, convergence checks, early stop
//! - **Secretary pipeline**: cache hits, the plan decision, artifact execution, report and
//!   cache persistence
//!
//! All three methods have default no-op implementations, so you only override what you care
//! about. The handler is shared as `Arc<dyn EventHandler>`; registering it on a
//! [`SecretaryCoordinator`](crate::secretary::SecretaryCoordinator) does not propagate it
//! anywhere else, so attach it to the agents and the orchestrator you want to observe.
//!
//! # Example
//!
//! ```rust,no_run
//! use aichat::event::{DiscussionEvent, EventHandler, SecretaryEvent};
//! use async_trait::async_trait;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl EventHandler for Printer {
//!     async fn on_discussion_event(&self, event: &DiscussionEvent) {
//!         if let DiscussionEvent::EarlyStop { round, score, .. } = event {
//!             println!("agreement after round {} ({:.2})", round, score);
//!         }
//!     }
//!     async fn on_secretary_event(&self, event: &SecretaryEvent) {
//!         println!("secretary: {:?}", event);
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::path::PathBuf;

/// Events emitted by an [`Agent`](crate::Agent) around each remote invocation.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Fired right before the remote call is made.
    InvocationStarted {
        agent_name: String,
        /// First ~120 characters of the prompt.
        prompt_preview: String,
    },

    /// The remote call returned text.
    InvocationCompleted {
        agent_name: String,
        response_length: usize,
        elapsed_ms: u64,
    },

    /// The remote call failed and was turned into soft-failure text.
    InvocationFailed {
        agent_name: String,
        error: String,
        elapsed_ms: u64,
    },
}

/// Events emitted by a [`DiscussionOrchestrator`](crate::discussion::DiscussionOrchestrator).
///
/// # Event Flow
///
/// ```text
/// RunStarted
///   └─ RoundStarted { round: 1 }
///       ├─ AgentResponded / AgentFailed (one per agent, enumeration order)
///       └─ ConvergenceChecked
///   └─ RoundCompleted { round: 1 }
///   └─ EarlyStop            (only when the score exceeded the threshold)
/// RunCompleted
/// ```
#[derive(Debug, Clone)]
pub enum DiscussionEvent {
    RunStarted {
        run_id: String,
        topic: String,
        agent_count: usize,
        max_rounds: usize,
    },
    RoundStarted {
        run_id: String,
        round: usize,
    },
    AgentResponded {
        run_id: String,
        round: usize,
        agent_name: String,
        response_length: usize,
    },
    AgentFailed {
        run_id: String,
        round: usize,
        agent_name: String,
        error: String,
    },
    ConvergenceChecked {
        run_id: String,
        round: usize,
        score: f32,
        threshold: f32,
    },
    RoundCompleted {
        run_id: String,
        round: usize,
    },
    EarlyStop {
        run_id: String,
        round: usize,
        score: f32,
    },
    RunCompleted {
        run_id: String,
        rounds: usize,
        converged: bool,
    },
}

/// Events emitted by the [`SecretaryCoordinator`](crate::secretary::SecretaryCoordinator).
#[derive(Debug, Clone)]
pub enum SecretaryEvent {
    /// The instruction was answered from the knowledge base; nothing else follows.
    CacheHit { instruction_digest: String },
    CacheMiss { instruction_digest: String },
    /// The planning step finished. `rounds` is `None` for a direct answer.
    PlanDecided {
        delegate: bool,
        rounds: Option<usize>,
    },
    ArtifactExecuted {
        script_path: PathBuf,
        summary: String,
    },
    ReportWritten { path: PathBuf },
    ReportFailed { error: String },
    CacheWriteFailed { error: String },
}

/// Receiver for every event kind. All methods default to no-ops.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_agent_event(&self, _event: &AgentEvent) {}

    async fn on_discussion_event(&self, _event: &DiscussionEvent) {}

    async fn on_secretary_event(&self, _event: &SecretaryEvent) {}
}
