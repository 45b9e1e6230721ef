use aichat::client_wrapper::{ClientWrapper, Message, RemoteCallError};
use aichat::event::{AgentEvent, EventHandler};
use aichat::interaction_log::FileInteractionLog;
use aichat::{Agent, InvocationMode};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockClient {
    response: Result<String, RemoteCallError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockClient {
    fn answering(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(cause: RemoteCallError) -> Self {
        Self {
            response: Err(cause),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(text: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::answering(text)
        }
    }
}

#[async_trait]
impl ClientWrapper for MockClient {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn send_message(&self, _messages: &[Message]) -> Result<Message, RemoteCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.clone().map(Message::assistant)
    }
}

#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<AgentEvent>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn on_agent_event(&self, event: &AgentEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[test]
fn test_agent_creation() {
    let agent = Agent::new(
        "OpenAI-o3-mini",
        "coding and logical reasoning",
        Arc::new(MockClient::answering("hi")),
    );

    assert_eq!(agent.name, "OpenAI-o3-mini");
    assert_eq!(agent.specialty, "coding and logical reasoning");
    assert_eq!(agent.mode, InvocationMode::Concurrent);
    assert_eq!(agent.model_name(), "mock-model");
    assert_eq!(agent.timeout(), Duration::from_secs(120));
}

#[tokio::test]
async fn test_invoke_returns_answer() {
    let client = Arc::new(MockClient::answering("Use a B-tree."));
    let agent = Agent::new("A", "storage", client.clone());

    let reply = agent.invoke("How do I index this?").await;

    assert_eq!(reply.agent_name, "A");
    assert_eq!(reply.outcome, Ok("Use a B-tree.".to_string()));
    assert!(!reply.is_failure());
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remote_failure_is_soft() {
    let agent = Agent::new(
        "Critic",
        "review",
        Arc::new(MockClient::failing(RemoteCallError::Transport(
            "connection reset".into(),
        ))),
    );

    let reply = agent.invoke("anything").await;

    assert!(reply.is_failure());
    assert_eq!(
        reply.failure(),
        Some(&RemoteCallError::Transport("connection reset".into()))
    );
    assert_eq!(
        reply.text(),
        "Critic invocation failed: transport error: connection reset"
    );
}

#[tokio::test]
async fn test_timeout_becomes_soft_failure() {
    let agent = Agent::new(
        "Slowpoke",
        "waiting",
        Arc::new(MockClient::slow("too late", Duration::from_secs(5))),
    )
    .with_timeout(Duration::from_millis(50));

    let reply = agent.invoke("hurry").await;

    assert_eq!(
        reply.failure(),
        Some(&RemoteCallError::Timeout(Duration::from_millis(50)))
    );
    assert!(reply.text().starts_with("Slowpoke invocation failed: timed out"));
}

#[tokio::test]
async fn test_every_invocation_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(FileInteractionLog::new(dir.path().join("logs.txt")).unwrap());

    let good = Agent::new("Good", "x", Arc::new(MockClient::answering("fine")))
        .with_interaction_log(log.clone());
    let bad = Agent::new(
        "Bad",
        "y",
        Arc::new(MockClient::failing(RemoteCallError::Provider("quota".into()))),
    )
    .with_interaction_log(log.clone());

    good.invoke("first prompt").await;
    bad.invoke("second prompt").await;

    let contents = std::fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("User: first prompt | Good: fine"));
    assert!(lines[1].ends_with("User: second prompt | Bad: Bad invocation failed: provider error: quota"));
}

#[tokio::test]
async fn test_events_are_emitted() {
    let handler = Arc::new(RecordingHandler::default());
    let agent = Agent::new("A", "x", Arc::new(MockClient::answering("12345")))
        .with_event_handler(handler.clone());

    agent.invoke("prompt").await;

    let events = handler.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        AgentEvent::InvocationStarted { agent_name, prompt_preview } if agent_name == "A" && prompt_preview == "prompt"
    ));
    assert!(matches!(
        &events[1],
        AgentEvent::InvocationCompleted { response_length: 5, .. }
    ));
}

#[test]
fn test_invoke_blocking_outside_runtime() {
    let agent = Agent::new("Sync", "ui", Arc::new(MockClient::answering("blocking ok")));
    let reply = agent.invoke_blocking("hello");
    assert_eq!(reply.text(), "blocking ok");
}

#[tokio::test]
async fn test_concurrent_invocations_share_one_agent() {
    let client = Arc::new(MockClient::slow("ok", Duration::from_millis(20)));
    let agent = Arc::new(Agent::new("Shared", "x", client.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let agent = agent.clone();
            tokio::spawn(async move { agent.invoke(&format!("prompt {}", i)).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().text(), "ok");
    }
    assert_eq!(client.calls.load(Ordering::SeqCst), 8);
}
