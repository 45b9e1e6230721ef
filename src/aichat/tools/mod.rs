//! Local collaborators the secretary hands work to: the file store for scripts and reports,
//! and the script runner for generated code.

pub mod code_runner;
pub mod file_store;

pub use code_runner::{CodeRunner, ExecutionError, ExecutionReport, ScriptRunner};
pub use file_store::{FileStore, FileStoreError, LocalFileStore, StoreDir};
