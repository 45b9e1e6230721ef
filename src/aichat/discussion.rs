//! The discussion group.
//!
//! A [`DiscussionOrchestrator`] runs a fixed set of shared, read-only [`Agent`]s for up to
//! `max_rounds` rounds on one topic and returns the resulting [`Transcript`].
//!
//! # Round semantics
//!
//! ```text
//! current_input = topic
//! for round in 1..=max_rounds
//!   ├─ one prompt per agent: topic + current_input + the agent's specialty
//!   ├─ fan out: Concurrent agents are spawned, Sequential agents awaited in place
//!   ├─ join barrier: every agent answers or soft-fails, nobody is cancelled
//!   ├─ append one entry per agent, in enumeration order
//!   ├─ current_input = carry-over of this round (last agent's reply by default)
//!   └─ score the round; score > threshold => early-stop note, no further rounds
//! ```
//!
//! Remote failures never abort a run: they are embedded as soft-failure text. The only errors
//! are structural ([`DiscussionError`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use aichat::Agent;
//! use aichat::clients::openai::OpenAIClient;
//! use aichat::discussion::DiscussionOrchestrator;
//! use std::sync::Arc;
//!
//! # async {
//! let mut group = DiscussionOrchestrator::new();
//! group
//!     .add_agent(Arc::new(Agent::new(
//!         "OpenAI-o3-mini",
//!         "coding and logical reasoning",
//!         Arc::new(OpenAIClient::new_with_model_string("key", "o3-mini")),
//!     )))
//!     .unwrap();
//!
//! let transcript = group.run("Design a rate limiter", 2).await.unwrap();
//! println!("{}", transcript.render());
//! # };
//! ```

use crate::agent::{Agent, AgentReply, InvocationMode};
use crate::client_wrapper::RemoteCallError;
use crate::convergence::{ConvergenceEvaluator, LexicalOverlap};
use crate::event::{DiscussionEvent, EventHandler};
use crate::transcript::{Transcript, TranscriptSegment};
use futures_util::future::join_all;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Scores strictly above this end a discussion early.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f32 = 0.8;

/// What the next round sees as "prior discussion".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryOver {
    /// The reply of the agent enumerated last in the round.
    LastResponse,
    /// Every reply of the round, in enumeration order, separated by blank lines.
    WholeRound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscussionError {
    /// The topic is empty or whitespace only.
    InvalidTopic,
    /// [`DiscussionOrchestrator::run`] was called before any agents were added.
    NoAgents,
    /// An agent with the same name is already in the group.
    DuplicateAgent(String),
}

impl fmt::Display for DiscussionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscussionError::InvalidTopic => write!(f, "Discussion topic must not be empty"),
            DiscussionError::NoAgents => write!(f, "No agents in the discussion group"),
            DiscussionError::DuplicateAgent(name) => {
                write!(f, "Agent with name '{}' already exists", name)
            }
        }
    }
}

impl Error for DiscussionError {}

/// Prompt sent to one agent for one round.
pub fn discussion_prompt(topic: &str, prior_discussion: &str, specialty: &str) -> String {
    format!(
        "Current discussion topic: {}\nPrior discussion: {}\nPlease share your view or proposed solution (your specialty is: {}).",
        topic, prior_discussion, specialty
    )
}

pub struct DiscussionOrchestrator {
    /// Agents in enumeration order. Order drives prompt construction, transcript order and
    /// the default carry-over, never priority.
    agents: Vec<Arc<Agent>>,
    evaluator: Arc<dyn ConvergenceEvaluator>,
    threshold: f32,
    carry_over: CarryOver,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl Default for DiscussionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscussionOrchestrator {
    /// An empty group using [`LexicalOverlap`], a 0.8 threshold and
    /// [`CarryOver::LastResponse`].
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            evaluator: Arc::new(LexicalOverlap),
            threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            carry_over: CarryOver::LastResponse,
            event_handler: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ConvergenceEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_carry_over(mut self, carry_over: CarryOver) -> Self {
        self.carry_over = carry_over;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Register an agent. Names must be unique within the group.
    pub fn add_agent(&mut self, agent: Arc<Agent>) -> Result<(), DiscussionError> {
        if self.agents.iter().any(|existing| existing.name == agent.name) {
            return Err(DiscussionError::DuplicateAgent(agent.name.clone()));
        }
        self.agents.push(agent);
        Ok(())
    }

    /// Agents in enumeration order.
    pub fn list_agents(&self) -> Vec<&Agent> {
        self.agents.iter().map(|agent| agent.as_ref()).collect()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    async fn emit(&self, event: DiscussionEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_discussion_event(&event).await;
        }
    }

    /// Run the discussion and return its transcript.
    ///
    /// Runs `max_rounds` rounds unless a round's convergence score exceeds the threshold, in
    /// which case an early-stop note is appended and no further round starts.
    ///
    /// # Errors
    ///
    /// [`DiscussionError::InvalidTopic`] for an empty topic and [`DiscussionError::NoAgents`]
    /// for an empty group. Nothing else: remote failures are embedded in the transcript.
    pub async fn run(&self, topic: &str, max_rounds: usize) -> Result<Transcript, DiscussionError> {
        if topic.trim().is_empty() {
            return Err(DiscussionError::InvalidTopic);
        }
        if self.agents.is_empty() {
            return Err(DiscussionError::NoAgents);
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        log::info!(
            "discussion {} started: {} agents, up to {} rounds",
            run_id,
            self.agents.len(),
            max_rounds
        );
        self.emit(DiscussionEvent::RunStarted {
            run_id: run_id.clone(),
            topic: topic.to_string(),
            agent_count: self.agents.len(),
            max_rounds,
        })
        .await;

        let mut transcript = Transcript::new();
        transcript.push(TranscriptSegment::DiscussionHeader {
            topic: topic.to_string(),
        });

        let mut current_input = topic.to_string();
        let mut rounds_run = 0;
        let mut converged = false;

        for round in 1..=max_rounds {
            rounds_run = round;
            self.emit(DiscussionEvent::RoundStarted {
                run_id: run_id.clone(),
                round,
            })
            .await;

            let replies = self.run_round(topic, &current_input).await;
            let texts: Vec<String> = replies.iter().map(AgentReply::text).collect();

            for (reply, text) in replies.iter().zip(&texts) {
                match &reply.outcome {
                    Ok(content) => {
                        self.emit(DiscussionEvent::AgentResponded {
                            run_id: run_id.clone(),
                            round,
                            agent_name: reply.agent_name.clone(),
                            response_length: content.len(),
                        })
                        .await
                    }
                    Err(cause) => {
                        self.emit(DiscussionEvent::AgentFailed {
                            run_id: run_id.clone(),
                            round,
                            agent_name: reply.agent_name.clone(),
                            error: cause.to_string(),
                        })
                        .await
                    }
                }
                transcript.push(TranscriptSegment::AgentEntry {
                    round,
                    agent_name: reply.agent_name.clone(),
                    text: text.clone(),
                    failed: reply.is_failure(),
                });
            }

            current_input = match self.carry_over {
                CarryOver::LastResponse => texts.last().cloned().unwrap_or(current_input),
                CarryOver::WholeRound => texts.join("\n\n"),
            };

            let views: Vec<&str> = texts.iter().map(String::as_str).collect();
            let score = self.evaluator.score(&views);
            log::debug!("discussion {} round {} convergence {:.3}", run_id, round, score);
            self.emit(DiscussionEvent::ConvergenceChecked {
                run_id: run_id.clone(),
                round,
                score,
                threshold: self.threshold,
            })
            .await;
            self.emit(DiscussionEvent::RoundCompleted {
                run_id: run_id.clone(),
                round,
            })
            .await;

            if score > self.threshold {
                transcript.push(TranscriptSegment::EarlyStop { round, score });
                self.emit(DiscussionEvent::EarlyStop {
                    run_id: run_id.clone(),
                    round,
                    score,
                })
                .await;
                converged = true;
                break;
            }
        }

        log::info!(
            "discussion {} finished after {} round(s){}",
            run_id,
            rounds_run,
            if converged { " (converged)" } else { "" }
        );
        self.emit(DiscussionEvent::RunCompleted {
            run_id,
            rounds: rounds_run,
            converged,
        })
        .await;

        Ok(transcript)
    }

    /// One fan-out/fan-in round. Replies come back in enumeration order no matter which
    /// agent finishes first.
    async fn run_round(&self, topic: &str, current_input: &str) -> Vec<AgentReply> {
        let mut slots: Vec<Option<AgentReply>> = vec![None; self.agents.len()];
        let mut spawned = Vec::new();
        let mut inline = Vec::new();

        for (index, agent) in self.agents.iter().enumerate() {
            let prompt = discussion_prompt(topic, current_input, &agent.specialty);
            match agent.mode {
                InvocationMode::Concurrent => {
                    let agent = Arc::clone(agent);
                    let name = agent.name.clone();
                    let handle = tokio::spawn(async move { agent.invoke(&prompt).await });
                    spawned.push((index, name, handle));
                }
                InvocationMode::Sequential => inline.push((index, Arc::clone(agent), prompt)),
            }
        }

        // Sequential agents overlap with the spawned ones but not with each other.
        for (index, agent, prompt) in inline {
            slots[index] = Some(agent.invoke(&prompt).await);
        }

        let (positions, handles): (Vec<_>, Vec<_>) = spawned
            .into_iter()
            .map(|(index, name, handle)| ((index, name), handle))
            .unzip();
        for ((index, name), joined) in positions.into_iter().zip(join_all(handles).await) {
            let reply = match joined {
                Ok(reply) => reply,
                Err(e) => {
                    log::error!("agent task for {} did not complete: {}", name, e);
                    AgentReply::failed(name, RemoteCallError::Aborted(e.to_string()))
                }
            };
            slots[index] = Some(reply);
        }

        slots.into_iter().flatten().collect()
    }
}
