// src/aichat/mod.rs

pub mod agent;
pub mod client_wrapper;
pub mod clients;
pub mod code_block;
pub mod commands;
pub mod config;
pub mod convergence;
pub mod discussion;
pub mod event;
pub mod interaction_log;
pub mod knowledge;
pub mod plan;
pub mod secretary;
pub mod tools;
pub mod transcript;

// Shorter paths for the types every caller needs, e.g. aichat::aichat::Agent
pub use agent::{Agent, AgentReply};
pub use secretary::{RunResult, SecretaryCoordinator};
