//! Bounded-time execution of generated scripts.
//!
//! [`ScriptRunner`] picks an interpreter from the file extension (`python3` for `.py`, `bash`
//! for `.sh`), runs the script as a child process with stdout and stderr captured, and kills
//! it, along with every process it started, when the wall-clock limit expires. A script that
//! runs and exits non-zero is not an error: it comes back as an [`ExecutionReport`] with a
//! non-zero `exit_code`.
//!
//! ```rust,no_run
//! use aichat::tools::code_runner::{CodeRunner, ScriptRunner};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async {
//! let runner = ScriptRunner::new().with_timeout(Duration::from_secs(5));
//! let outcome = runner.run(Path::new("data/scripts/solution.py")).await;
//! println!("{}", aichat::tools::code_runner::render_outcome(&outcome));
//! # };
//! ```

use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

/// Hard wall-clock limit for one script run.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Output of a script that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was ended by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ExecutionReport {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn render(&self) -> String {
        if self.success() {
            format!("Run succeeded:\n{}", self.stdout)
        } else {
            format!("Run failed:\n{}", self.stderr)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The script was killed after running past the limit.
    Timeout(Duration),
    /// No interpreter is configured for this file type.
    Unsupported(String),
    /// The interpreter could not be started.
    Launch(String),
    NotFound(String),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Timeout(_) => write!(f, "execution timed out"),
            ExecutionError::Unsupported(ext) => {
                write!(f, "no interpreter for '{}' files, not executed", ext)
            }
            ExecutionError::Launch(msg) => write!(f, "execution error: {}", msg),
            ExecutionError::NotFound(path) => write!(f, "file not found: {}", path),
        }
    }
}

impl Error for ExecutionError {}

/// The text a run contributes to a result: the report, or the error sentence.
pub fn render_outcome(outcome: &Result<ExecutionReport, ExecutionError>) -> String {
    match outcome {
        Ok(report) => report.render(),
        Err(e) => e.to_string(),
    }
}

#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, script: &Path) -> Result<ExecutionReport, ExecutionError>;
}

pub struct ScriptRunner {
    timeout: Duration,
    python: String,
    shell: String,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_EXECUTION_TIMEOUT,
            python: "python3".to_string(),
            shell: "bash".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the Python interpreter (e.g. a virtualenv's `python`).
    pub fn with_python(mut self, interpreter: impl Into<String>) -> Self {
        self.python = interpreter.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn interpreter_for(&self, script: &Path) -> Result<&str, ExecutionError> {
        let ext = script
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "py" => Ok(self.python.as_str()),
            "sh" => Ok(self.shell.as_str()),
            other => Err(ExecutionError::Unsupported(format!(".{}", other))),
        }
    }
}

#[async_trait]
impl CodeRunner for ScriptRunner {
    async fn run(&self, script: &Path) -> Result<ExecutionReport, ExecutionError> {
        if !script.is_file() {
            return Err(ExecutionError::NotFound(script.display().to_string()));
        }
        let interpreter = self.interpreter_for(script)?;

        let started = Instant::now();
        let mut command = tokio::process::Command::new(interpreter);
        command
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout also reaches whatever the script started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.as_std_mut().process_group(0);
        }

        let child = command.spawn().map_err(|e| {
            log::warn!("could not launch {} for {}: {}", interpreter, script.display(), e);
            ExecutionError::Launch(e.to_string())
        })?;
        let pid = child.id();

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                log::warn!("lost track of {}: {}", script.display(), e);
                kill_process_group(pid);
                return Err(ExecutionError::Launch(e.to_string()));
            }
            Err(_) => {
                // The interpreter itself went with the dropped child; this takes its descendants.
                kill_process_group(pid);
                log::warn!(
                    "{} exceeded {:.1}s and was killed",
                    script.display(),
                    self.timeout.as_secs_f64()
                );
                return Err(ExecutionError::Timeout(self.timeout));
            }
        };

        let report = ExecutionReport {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        log::info!(
            "ran {} with {}: exit {} in {}ms",
            script.display(),
            interpreter,
            report.exit_code,
            report.duration_ms
        );
        Ok(report)
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        // ESRCH: the whole group had already exited.
        log::debug!(
            "killpg({}) failed: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
