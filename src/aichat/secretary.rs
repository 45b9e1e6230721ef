//! The secretary: one instruction in, one [`RunResult`] out.
//!
//! [`SecretaryCoordinator::process`] is a straight pipeline with no state carried between
//! calls other than the knowledge base:
//!
//! ```text
//! instruction ─► knowledge base ──hit──► "Found in knowledge base" (no remote calls)
//!                     │ miss
//!                     ▼
//!                planning agent ─► PlanParser
//!                     │
//!        ┌────────────┴─────────────┐
//!   Plan::Delegate              Plan::DirectAnswer
//!   discussion group            planning agent answers
//!   + secretary synthesis       the raw instruction
//!        └────────────┬─────────────┘
//!                     ▼
//!        first fenced code block? ─► scripts/solution_<ts>.<ext> ─► run (bounded)
//!                     ▼
//!        reports/report_<ts>.md, knowledge base entry
//! ```
//!
//! Remote failures never stop the pipeline; they travel as soft-failure text like any other
//! answer. Only an empty instruction is rejected, before any remote call.
//!
//! # Example
//!
//! ```rust,no_run
//! use aichat::config::AiChatConfig;
//! use aichat::secretary::SecretaryCoordinator;
//!
//! # async {
//! let config = AiChatConfig::from_env().unwrap();
//! let secretary = SecretaryCoordinator::from_config(&config).unwrap();
//! let result = secretary
//!     .process("discuss how to rate-limit an API", Some("rating: 3/5"))
//!     .await
//!     .unwrap();
//! println!("{}", result.result_text);
//! # };
//! ```

use crate::agent::Agent;
use crate::code_block::extract_code_block;
use crate::commands::Passthrough;
use crate::config::AiChatConfig;
use crate::discussion::DiscussionOrchestrator;
use crate::event::{EventHandler, SecretaryEvent};
use crate::interaction_log::{FileInteractionLog, InteractionLogger};
use crate::knowledge::{instruction_digest, FileCacheStore, ResultCache};
use crate::plan::{Feedback, Plan, PlanParser};
use crate::tools::code_runner::{render_outcome, CodeRunner, ScriptRunner};
use crate::tools::file_store::{FileStore, FileStoreError, LocalFileStore, StoreDir};
use crate::transcript::{Transcript, TranscriptSegment};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretaryError {
    /// The instruction is empty or whitespace only.
    InvalidInstruction,
    /// A passthrough file command failed.
    FileStore(FileStoreError),
    /// The coordinator could not be assembled from configuration.
    Setup(String),
}

impl fmt::Display for SecretaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretaryError::InvalidInstruction => write!(f, "Instruction must not be empty"),
            SecretaryError::FileStore(e) => write!(f, "{}", e),
            SecretaryError::Setup(msg) => write!(f, "Secretary setup failed: {}", msg),
        }
    }
}

impl Error for SecretaryError {}

impl From<FileStoreError> for SecretaryError {
    fn from(e: FileStoreError) -> Self {
        SecretaryError::FileStore(e)
    }
}

/// What one call to [`SecretaryCoordinator::process`] or [`SecretaryCoordinator::handle`]
/// produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Text to show the user.
    pub result_text: String,
    pub transcript: Transcript,
    /// The generated script, or the file a passthrough command touched.
    pub artifact_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    /// Artifact and execution summary; never part of the transcript.
    pub execution_output: Option<String>,
    pub from_cache: bool,
}

impl RunResult {
    fn message(text: String, artifact_path: Option<PathBuf>) -> Self {
        Self {
            result_text: text,
            transcript: Transcript::new(),
            artifact_path,
            report_path: None,
            execution_output: None,
            from_cache: false,
        }
    }
}

fn setup_error(e: impl fmt::Display) -> SecretaryError {
    SecretaryError::Setup(e.to_string())
}

/// The planning prompt: instruction, the delegation convention, and any feedback.
pub fn secretary_prompt(instruction: &str, feedback: Option<&str>, marker: &str) -> String {
    format!(
        "User input: {}\n\
         You are my AI secretary. Parse my instruction, decide whether the discussion group needs to be involved, and draw up a task plan.\n\
         If a discussion is needed, say \"{}\" and name the discussion topic and the number of rounds; if a direct answer is enough, give the answer directly; if code is needed, state the code requirements clearly.\n\
         User feedback: {}. Adjust the strategy based on it (for example, add discussion rounds).",
        instruction,
        marker,
        feedback.unwrap_or("none"),
    )
}

pub fn synthesis_prompt(transcript_text: &str) -> String {
    format!(
        "Below is the discussion group's transcript:\n{}\nAs the AI secretary, summarize the discussion and propose a final solution (generate code if needed).",
        transcript_text
    )
}

pub struct SecretaryCoordinator {
    planner: Arc<Agent>,
    orchestrator: Arc<DiscussionOrchestrator>,
    cache: Arc<ResultCache>,
    files: Arc<dyn FileStore>,
    runner: Arc<dyn CodeRunner>,
    plan_parser: PlanParser,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl SecretaryCoordinator {
    pub fn new(
        planner: Arc<Agent>,
        orchestrator: Arc<DiscussionOrchestrator>,
        cache: Arc<ResultCache>,
        files: Arc<dyn FileStore>,
        runner: Arc<dyn CodeRunner>,
    ) -> Self {
        Self {
            planner,
            orchestrator,
            cache,
            files,
            runner,
            plan_parser: PlanParser::new(),
            event_handler: None,
        }
    }

    pub fn with_plan_parser(mut self, parser: PlanParser) -> Self {
        self.plan_parser = parser;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Wire real clients, the on-disk stores under `config.data_dir` and the script runner.
    ///
    /// Every agent shares one append-only interaction log at `config.log_file()`.
    pub fn from_config(config: &AiChatConfig) -> Result<Self, SecretaryError> {
        let interaction_log: Arc<dyn InteractionLogger> =
            Arc::new(FileInteractionLog::new(config.log_file()).map_err(setup_error)?);

        let planner = config
            .secretary
            .build_agent(config.remote_timeout)
            .with_interaction_log(Arc::clone(&interaction_log));

        let mut orchestrator = DiscussionOrchestrator::new()
            .with_convergence_threshold(config.convergence_threshold)
            .with_carry_over(config.carry_over);
        for spec in &config.discussion_group {
            let agent = spec
                .build_agent(config.remote_timeout)
                .with_interaction_log(Arc::clone(&interaction_log));
            orchestrator
                .add_agent(Arc::new(agent))
                .map_err(setup_error)?;
        }

        let store = FileCacheStore::new(config.knowledge_dir()).map_err(setup_error)?;
        let files = LocalFileStore::new(&config.data_dir).map_err(setup_error)?;
        let runner = ScriptRunner::new().with_timeout(config.execution_timeout);

        log::info!(
            "secretary {} with {} discussion member(s), data in {}",
            config.secretary.model,
            config.discussion_group.len(),
            config.data_dir.display()
        );

        Ok(Self::new(
            Arc::new(planner),
            Arc::new(orchestrator),
            Arc::new(ResultCache::new(Arc::new(store))),
            Arc::new(files),
            Arc::new(runner),
        )
        .with_plan_parser(
            PlanParser::new()
                .with_rounds(config.default_rounds, config.escalated_rounds)
                .with_low_rating_threshold(config.low_rating_threshold),
        ))
    }

    pub fn planner(&self) -> &Agent {
        &self.planner
    }

    pub fn orchestrator(&self) -> &DiscussionOrchestrator {
        &self.orchestrator
    }

    async fn emit(&self, event: SecretaryEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_secretary_event(&event).await;
        }
    }

    /// Front door for shells: passthrough file commands are served directly, everything else
    /// goes to [`SecretaryCoordinator::process`].
    pub async fn handle(
        &self,
        input: &str,
        feedback: Option<&str>,
    ) -> Result<RunResult, SecretaryError> {
        match Passthrough::parse(input) {
            Some(Passthrough::CreateFile { name, content }) => {
                let path = self.files.write(&name, &content, StoreDir::Scripts)?;
                Ok(RunResult::message(
                    format!("File created: {}", path.display()),
                    Some(path),
                ))
            }
            Some(Passthrough::ReadFile { name }) => {
                let content = self.files.read(&name, StoreDir::Scripts)?;
                Ok(RunResult::message(format!("File content:\n{}", content), None))
            }
            None => self.process(input, feedback).await,
        }
    }

    /// Run one instruction through the pipeline.
    ///
    /// # Errors
    ///
    /// Only [`SecretaryError::InvalidInstruction`], before any remote call. Remote, execution,
    /// report and knowledge-base failures are logged and folded into the result.
    pub async fn process(
        &self,
        instruction: &str,
        feedback: Option<&str>,
    ) -> Result<RunResult, SecretaryError> {
        if instruction.trim().is_empty() {
            return Err(SecretaryError::InvalidInstruction);
        }

        let digest = instruction_digest(instruction);
        if let Some(entry) = self.cache.get(instruction) {
            log::info!("instruction {} answered from the knowledge base", digest);
            self.emit(SecretaryEvent::CacheHit {
                instruction_digest: digest,
            })
            .await;
            return Ok(RunResult {
                result_text: format!("Found in knowledge base:\n{}", entry.result),
                transcript: entry.transcript,
                artifact_path: None,
                report_path: None,
                execution_output: None,
                from_cache: true,
            });
        }
        self.emit(SecretaryEvent::CacheMiss {
            instruction_digest: digest.clone(),
        })
        .await;

        let plan_reply = self
            .planner
            .invoke(&secretary_prompt(
                instruction,
                feedback,
                self.plan_parser.marker(),
            ))
            .await;
        let plan_text = plan_reply.text();

        let mut transcript = Transcript::new();
        transcript.push(TranscriptSegment::SecretaryHeader {
            instruction: instruction.to_string(),
            plan: plan_text.clone(),
        });

        let feedback = feedback.map(Feedback::parse);
        let plan = self
            .plan_parser
            .parse(&plan_text, instruction, feedback.as_ref());
        let (delegate, rounds) = match &plan {
            Plan::Delegate { rounds, .. } => (true, Some(*rounds)),
            Plan::DirectAnswer => (false, None),
        };
        log::info!(
            "plan for {}: {}",
            digest,
            match rounds {
                Some(rounds) => format!("delegate, {} round(s)", rounds),
                None => "direct answer".to_string(),
            }
        );
        self.emit(SecretaryEvent::PlanDecided { delegate, rounds })
            .await;

        let final_response = match plan {
            Plan::Delegate { topic, rounds } => {
                match self.orchestrator.run(&topic, rounds).await {
                    Ok(discussion) => {
                        transcript.append(discussion);
                        let synthesis = self
                            .planner
                            .invoke(&synthesis_prompt(&transcript.render()))
                            .await
                            .text();
                        transcript.push(TranscriptSegment::Synthesis {
                            text: synthesis.clone(),
                        });
                        synthesis
                    }
                    Err(e) => {
                        log::warn!("discussion could not start ({}), answering directly", e);
                        self.direct_answer(instruction, &mut transcript).await
                    }
                }
            }
            Plan::DirectAnswer => self.direct_answer(instruction, &mut transcript).await,
        };

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let (artifact_path, execution_output) =
            match self.run_artifact(&final_response, &stamp).await {
                Some((path, output)) => (path, Some(output)),
                None => (None, None),
            };

        let report_path = match self.files.write(
            &format!("report_{}.md", stamp),
            &transcript.render(),
            StoreDir::Reports,
        ) {
            Ok(path) => {
                self.emit(SecretaryEvent::ReportWritten { path: path.clone() })
                    .await;
                Some(path)
            }
            Err(e) => {
                log::error!("could not save report for {}: {}", digest, e);
                self.emit(SecretaryEvent::ReportFailed {
                    error: e.to_string(),
                })
                .await;
                None
            }
        };

        let full_text = format!(
            "{}{}",
            transcript.render(),
            execution_output.as_deref().unwrap_or("")
        );
        if let Err(e) = self.cache.put(instruction, &transcript, &full_text) {
            log::error!("could not save {} to the knowledge base: {}", digest, e);
            self.emit(SecretaryEvent::CacheWriteFailed {
                error: e.to_string(),
            })
            .await;
        }

        let saved_to = match &report_path {
            Some(path) => path.display().to_string(),
            None => "(report not saved)".to_string(),
        };
        Ok(RunResult {
            result_text: format!("Task complete!\n{}\nReport saved to: {}", full_text, saved_to),
            transcript,
            artifact_path,
            report_path,
            execution_output,
            from_cache: false,
        })
    }

    async fn direct_answer(&self, instruction: &str, transcript: &mut Transcript) -> String {
        let answer = self.planner.invoke(instruction).await.text();
        transcript.push(TranscriptSegment::DirectAnswer {
            text: answer.clone(),
        });
        answer
    }

    /// Save and run the first code block of `final_response`, if there is one. Returns the
    /// saved path (when saving worked) and the execution output text.
    async fn run_artifact(
        &self,
        final_response: &str,
        stamp: &str,
    ) -> Option<(Option<PathBuf>, String)> {
        let block = extract_code_block(final_response)?;
        let name = format!("solution_{}.{}", stamp, block.extension());

        let path = match self.files.write(&name, &block.body, StoreDir::Scripts) {
            Ok(path) => path,
            Err(e) => {
                log::error!("could not save generated code as {}: {}", name, e);
                return Some((None, format!("\nGenerated code could not be saved: {}", e)));
            }
        };

        let outcome = self.runner.run(&path).await;
        let summary = render_outcome(&outcome);
        self.emit(SecretaryEvent::ArtifactExecuted {
            script_path: path.clone(),
            summary: summary.clone(),
        })
        .await;

        let output = format!(
            "\nGenerated and ran code:\nFile: {}\n{}",
            path.display(),
            summary
        );
        Some((Some(path), output))
    }
}
