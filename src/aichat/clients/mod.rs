//! Provider specific [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular vendor's API while
//! conforming to the uniform contract the agents rely on.

pub mod common;
pub mod http_pool;

pub mod grok;
pub mod openai;
