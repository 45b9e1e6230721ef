use aichat::client_wrapper::{ClientWrapper, Message, RemoteCallError};
use aichat::discussion::DiscussionOrchestrator;
use aichat::event::{EventHandler, SecretaryEvent};
use aichat::knowledge::{
    instruction_digest, CacheEntry, CacheIoError, CacheStore, FileCacheStore,
    InMemoryCacheStore, ResultCache,
};
use aichat::tools::code_runner::{CodeRunner, ExecutionError, ExecutionReport, ScriptRunner};
use aichat::tools::file_store::{FileStoreError, LocalFileStore};
use aichat::transcript::TranscriptSegment;
use aichat::{Agent, SecretaryCoordinator, SecretaryError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Plays the secretary: answers by prompt kind and counts calls.
struct PlannerClient {
    plan: String,
    synthesis: String,
    direct: String,
    calls: AtomicUsize,
}

impl PlannerClient {
    fn new(plan: &str) -> Self {
        Self {
            plan: plan.to_string(),
            synthesis: "final proposal".to_string(),
            direct: "direct answer".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with_direct(mut self, direct: &str) -> Self {
        self.direct = direct.to_string();
        self
    }

    fn with_synthesis(mut self, synthesis: &str) -> Self {
        self.synthesis = synthesis.to_string();
        self
    }
}

#[async_trait]
impl ClientWrapper for PlannerClient {
    fn model_name(&self) -> &str {
        "mock-planner"
    }

    async fn send_message(&self, messages: &[Message]) -> Result<Message, RemoteCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = &messages[0].content;
        let reply = if prompt.starts_with("User input: ") {
            &self.plan
        } else if prompt.starts_with("Below is the discussion group's transcript:") {
            &self.synthesis
        } else {
            &self.direct
        };
        Ok(Message::assistant(reply.clone()))
    }
}

struct MemberClient {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MemberClient {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ClientWrapper for MemberClient {
    fn model_name(&self) -> &str {
        "mock-member"
    }

    async fn send_message(&self, messages: &[Message]) -> Result<Message, RemoteCallError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts
            .lock()
            .unwrap()
            .push(messages[0].content.clone());
        Ok(Message::assistant(format!("member view {}", n)))
    }
}

struct FailingClient;

#[async_trait]
impl ClientWrapper for FailingClient {
    fn model_name(&self) -> &str {
        "down"
    }

    async fn send_message(&self, _messages: &[Message]) -> Result<Message, RemoteCallError> {
        Err(RemoteCallError::Transport("unreachable".into()))
    }
}

/// Records which scripts it was asked to run.
#[derive(Default)]
struct RecordingRunner {
    runs: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl CodeRunner for RecordingRunner {
    async fn run(&self, script: &Path) -> Result<ExecutionReport, ExecutionError> {
        self.runs.lock().unwrap().push(script.to_path_buf());
        Ok(ExecutionReport {
            stdout: "ran\n".into(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 1,
        })
    }
}

struct BrokenStore;

impl CacheStore for BrokenStore {
    fn load(&self, _key: &str) -> Result<Option<CacheEntry>, CacheIoError> {
        Ok(None)
    }

    fn store(&self, _key: &str, _entry: &CacheEntry) -> Result<(), CacheIoError> {
        Err(CacheIoError::Io("disk full".into()))
    }
}

#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<SecretaryEvent>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn on_secretary_event(&self, event: &SecretaryEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Fixture {
    _temp_dir: TempDir,
    root: PathBuf,
    planner: Arc<PlannerClient>,
    member: Arc<MemberClient>,
    secretary: SecretaryCoordinator,
}

fn fixture_with(
    planner: PlannerClient,
    store: Arc<dyn CacheStore>,
    runner: Arc<dyn CodeRunner>,
) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    let planner = Arc::new(planner);
    let member = Arc::new(MemberClient::new());

    let mut group = DiscussionOrchestrator::new();
    group
        .add_agent(Arc::new(Agent::new(
            "OpenAI-o3-mini",
            "coding and logical reasoning",
            member.clone(),
        )))
        .unwrap();

    let secretary = SecretaryCoordinator::new(
        Arc::new(Agent::new("Secretary", "planning", planner.clone())),
        Arc::new(group),
        Arc::new(ResultCache::new(store)),
        Arc::new(LocalFileStore::new(&root).unwrap()),
        runner,
    );

    Fixture {
        _temp_dir: temp_dir,
        root,
        planner,
        member,
        secretary,
    }
}

fn fixture(planner: PlannerClient) -> Fixture {
    fixture_with(
        planner,
        Arc::new(InMemoryCacheStore::new()),
        Arc::new(RecordingRunner::default()),
    )
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_direct_answer_never_convenes_the_group() {
    let f = fixture(PlannerClient::new("I can answer this myself."));

    let result = f.secretary.process("what is 2+2?", None).await.unwrap();

    assert_eq!(f.member.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.planner.calls.load(Ordering::SeqCst), 2);
    assert!(matches!(
        result.transcript.segments(),
        [
            TranscriptSegment::SecretaryHeader { .. },
            TranscriptSegment::DirectAnswer { text }
        ] if text == "direct answer"
    ));
    assert!(!result.from_cache);
    assert!(result.result_text.starts_with("Task complete!\n# AI Secretary Work Log"));
}

#[tokio::test]
async fn test_delegation_runs_default_rounds_and_synthesizes() {
    let f = fixture(PlannerClient::new("This Needs Discussion in the group."));

    let result = f
        .secretary
        .process("discuss caching strategies", None)
        .await
        .unwrap();

    assert_eq!(f.member.calls.load(Ordering::SeqCst), 2);
    assert_eq!(f.planner.calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.transcript.rounds(), 2);
    assert!(matches!(
        result.transcript.segments().last(),
        Some(TranscriptSegment::Synthesis { text }) if text == "final proposal"
    ));

    let prompts = f.member.prompts.lock().unwrap();
    assert!(prompts[0].starts_with("Current discussion topic: caching strategies\n"));
}

#[tokio::test]
async fn test_low_rating_escalates_to_three_rounds() {
    let f = fixture(PlannerClient::new("needs discussion"));

    let result = f
        .secretary
        .process("how should we shard users?", Some("rating: 3/5"))
        .await
        .unwrap();

    assert_eq!(f.member.calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.transcript.rounds(), 3);
}

#[tokio::test]
async fn test_good_rating_keeps_default_rounds() {
    let f = fixture(PlannerClient::new("needs discussion"));

    f.secretary
        .process("how should we shard users?", Some("rating: 5/5, great"))
        .await
        .unwrap();

    assert_eq!(f.member.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_second_identical_instruction_is_served_from_cache() {
    let f = fixture(PlannerClient::new("needs discussion"));

    let first = f.secretary.process("design a queue", None).await.unwrap();
    let planner_calls = f.planner.calls.load(Ordering::SeqCst);
    let member_calls = f.member.calls.load(Ordering::SeqCst);

    let second = f.secretary.process("design a queue", None).await.unwrap();

    assert_eq!(f.planner.calls.load(Ordering::SeqCst), planner_calls);
    assert_eq!(f.member.calls.load(Ordering::SeqCst), member_calls);
    assert!(second.from_cache);
    assert_eq!(second.transcript, first.transcript);
    assert_eq!(
        second.result_text,
        format!("Found in knowledge base:\n{}", first.transcript.render())
    );
    assert_eq!(second.report_path, None);
}

#[tokio::test]
async fn test_cache_survives_a_new_coordinator() {
    let cache_dir = TempDir::new().unwrap();

    let f = fixture_with(
        PlannerClient::new("direct"),
        Arc::new(FileCacheStore::new(cache_dir.path()).unwrap()),
        Arc::new(RecordingRunner::default()),
    );
    f.secretary.process("persist me", None).await.unwrap();

    let g = fixture_with(
        PlannerClient::new("direct"),
        Arc::new(FileCacheStore::new(cache_dir.path()).unwrap()),
        Arc::new(RecordingRunner::default()),
    );
    let result = g.secretary.process("persist me", None).await.unwrap();

    assert!(result.from_cache);
    assert_eq!(g.planner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_code_block_is_saved_verbatim_and_run() {
    let runner = Arc::new(RecordingRunner::default());
    let f = fixture_with(
        PlannerClient::new("answer directly")
            .with_direct("Here:\n```python\nprint(1+1)\n```\nEnjoy."),
        Arc::new(InMemoryCacheStore::new()),
        runner.clone(),
    );

    let result = f.secretary.process("add one and one", None).await.unwrap();

    let artifact = result.artifact_path.clone().unwrap();
    assert_eq!(std::fs::read(&artifact).unwrap(), b"print(1+1)");
    assert!(artifact.starts_with(f.root.join("scripts")));
    let name = artifact.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("solution_") && name.ends_with(".py"));
    assert_eq!(*runner.runs.lock().unwrap(), vec![artifact.clone()]);

    let output = result.execution_output.clone().unwrap();
    assert_eq!(
        output,
        format!(
            "\nGenerated and ran code:\nFile: {}\nRun succeeded:\nran\n",
            artifact.display()
        )
    );
    // Execution output goes into the result, never into the transcript.
    assert!(result.result_text.contains(&output));
    assert!(!result.transcript.render().contains("Generated and ran code"));
}

#[tokio::test]
async fn test_python_round_trip() {
    if !python_available() {
        return;
    }
    let f = fixture_with(
        PlannerClient::new("answer directly").with_direct("```python\nprint(1+1)\n```"),
        Arc::new(InMemoryCacheStore::new()),
        Arc::new(ScriptRunner::new()),
    );

    let result = f.secretary.process("compute 1+1 in python", None).await.unwrap();

    let output = result.execution_output.unwrap();
    assert!(output.contains("Run succeeded:\n2"));
}

#[tokio::test]
async fn test_synthesis_code_is_extracted_after_discussion() {
    let runner = Arc::new(RecordingRunner::default());
    let f = fixture_with(
        PlannerClient::new("needs discussion").with_synthesis("```bash\necho done\n```"),
        Arc::new(InMemoryCacheStore::new()),
        runner.clone(),
    );

    let result = f.secretary.process("write a deploy script", None).await.unwrap();

    let artifact = result.artifact_path.unwrap();
    assert_eq!(artifact.extension().unwrap(), "sh");
    assert_eq!(std::fs::read_to_string(artifact).unwrap(), "echo done");
}

#[tokio::test]
async fn test_report_holds_the_transcript() {
    let f = fixture(PlannerClient::new("needs discussion"));

    let result = f.secretary.process("compare two designs", None).await.unwrap();

    let report = result.report_path.clone().unwrap();
    assert!(report.starts_with(f.root.join("reports")));
    let name = report.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("report_") && name.ends_with(".md"));
    assert_eq!(
        std::fs::read_to_string(&report).unwrap(),
        result.transcript.render()
    );
    assert!(result
        .result_text
        .ends_with(&format!("\nReport saved to: {}", report.display())));
}

#[tokio::test]
async fn test_empty_instruction_is_rejected_before_any_call() {
    let f = fixture(PlannerClient::new("needs discussion"));

    assert_eq!(
        f.secretary.process("   ", None).await,
        Err(SecretaryError::InvalidInstruction)
    );
    assert_eq!(f.planner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_planner_degrades_gracefully() {
    let temp_dir = TempDir::new().unwrap();
    let secretary = SecretaryCoordinator::new(
        Arc::new(Agent::new("Secretary", "planning", Arc::new(FailingClient))),
        Arc::new(DiscussionOrchestrator::new()),
        Arc::new(ResultCache::new(Arc::new(InMemoryCacheStore::new()))),
        Arc::new(LocalFileStore::new(temp_dir.path()).unwrap()),
        Arc::new(RecordingRunner::default()),
    );

    let result = secretary.process("anything", None).await.unwrap();

    assert!(result
        .result_text
        .contains("Secretary invocation failed: transport error: unreachable"));
    assert_eq!(result.artifact_path, None);
}

#[tokio::test]
async fn test_delegation_without_members_answers_directly() {
    let temp_dir = TempDir::new().unwrap();
    let planner = Arc::new(PlannerClient::new("needs discussion"));
    let secretary = SecretaryCoordinator::new(
        Arc::new(Agent::new("Secretary", "planning", planner.clone())),
        Arc::new(DiscussionOrchestrator::new()),
        Arc::new(ResultCache::new(Arc::new(InMemoryCacheStore::new()))),
        Arc::new(LocalFileStore::new(temp_dir.path()).unwrap()),
        Arc::new(RecordingRunner::default()),
    );

    let result = secretary.process("debate this", None).await.unwrap();

    assert!(matches!(
        result.transcript.segments().last(),
        Some(TranscriptSegment::DirectAnswer { .. })
    ));
}

#[tokio::test]
async fn test_cache_write_failure_still_returns_result() {
    let handler = Arc::new(RecordingHandler::default());
    let f = fixture_with(
        PlannerClient::new("direct"),
        Arc::new(BrokenStore),
        Arc::new(RecordingRunner::default()),
    );
    let secretary = f.secretary.with_event_handler(handler.clone());

    let result = secretary.process("remember me", None).await.unwrap();

    assert!(result.result_text.starts_with("Task complete!"));
    let events = handler.events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        SecretaryEvent::CacheWriteFailed { error } if error.contains("disk full")
    )));
}

#[tokio::test]
async fn test_pipeline_events() {
    let handler = Arc::new(RecordingHandler::default());
    let f = fixture(PlannerClient::new("needs discussion"));
    let secretary = f.secretary.with_event_handler(handler.clone());

    secretary.process("q", Some("rating: 2")).await.unwrap();
    secretary.process("q", None).await.unwrap();

    let events = handler.events.lock().unwrap();
    let digest = instruction_digest("q");
    assert!(matches!(
        &events[0],
        SecretaryEvent::CacheMiss { instruction_digest: seen } if *seen == digest
    ));
    assert!(matches!(
        events[1],
        SecretaryEvent::PlanDecided {
            delegate: true,
            rounds: Some(3)
        }
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, SecretaryEvent::ReportWritten { .. })));
    assert!(matches!(
        events.last(),
        Some(SecretaryEvent::CacheHit { instruction_digest: seen }) if *seen == digest
    ));
}

#[tokio::test]
async fn test_passthrough_file_commands() {
    let f = fixture(PlannerClient::new("needs discussion"));

    let created = f
        .secretary
        .handle("create file hello.py print('hello world')", None)
        .await
        .unwrap();
    let path = created.artifact_path.clone().unwrap();
    assert_eq!(path, f.root.join("scripts").join("hello.py"));
    assert_eq!(created.result_text, format!("File created: {}", path.display()));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "print('hello world')"
    );

    let read = f.secretary.handle("read file hello.py", None).await.unwrap();
    assert_eq!(read.result_text, "File content:\nprint('hello world')");

    assert_eq!(
        f.secretary.handle("read file missing.py", None).await,
        Err(SecretaryError::FileStore(FileStoreError::NotFound(
            "missing.py".into()
        )))
    );
    assert_eq!(f.planner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handle_falls_through_to_process() {
    let f = fixture(PlannerClient::new("direct"));

    let result = f.secretary.handle("what is a file?", None).await.unwrap();

    assert!(result.result_text.starts_with("Task complete!"));
    assert_eq!(f.planner.calls.load(Ordering::SeqCst), 2);
}
