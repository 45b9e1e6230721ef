//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI's Chat Completions API and
//! for any endpoint that speaks the same protocol.
//!
//! # Example
//!
//! ```rust,no_run
//! use aichat::clients::openai::{Model, OpenAIClient};
//! use aichat::client_wrapper::{ClientWrapper, Message};
//!
//! #[tokio::main]
//! async fn main() {
//!     let secret_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
//!     let client = OpenAIClient::new_with_model_enum(&secret_key, Model::O3Mini);
//!
//!     let reply = client.send_message(&[Message::user("Hello!")]).await.unwrap();
//!     println!("Assistant: {}", reply.content);
//!
//!     if let Some(usage) = client.get_last_usage() {
//!         println!("Tokens used: {}", usage.total_tokens);
//!     }
//! }
//! ```

use async_trait::async_trait;
use openai_rust2 as openai_rust;
use std::sync::Mutex;

use crate::client_wrapper::{ClientWrapper, Message, RemoteCallError, TokenUsage};
use crate::clients::common::{send_and_track, to_chat_messages, CHAT_COMPLETIONS_PATH};
use crate::clients::http_pool::get_http_client;

/// Default OpenAI REST endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Model identifiers used by the discussion group.
pub enum Model {
    /// `o3-mini` – compact reasoning model, strong at code and logic.
    O3Mini,
    /// `o4-mini` – newer low-latency reasoning tier.
    O4Mini,
    /// `gpt-4o` – general purpose Omni model.
    GPT4o,
    /// `gpt-4o-mini` – cost effective GPT-4o derivative.
    GPT4oMini,
    /// `gpt-4.1-mini` – reduced cost GPT-4.1 tier.
    GPT41Mini,
}

/// Convert a [`Model`] variant into the string identifier expected by the REST API.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::O3Mini => "o3-mini".to_string(),
        Model::O4Mini => "o4-mini".to_string(),
        Model::GPT4o => "gpt-4o".to_string(),
        Model::GPT4oMini => "gpt-4o-mini".to_string(),
        Model::GPT41Mini => "gpt-4.1-mini".to_string(),
    }
}

/// Client wrapper for OpenAI's Chat Completions API.
///
/// Keeps the selected model identifier plus a [`TokenUsage`] slot for the most recent request.
pub struct OpenAIClient {
    client: openai_rust::Client,
    model: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, OPENAI_BASE_URL)
    }

    /// Construct a client targeting any OpenAI compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client_and_base_url(
                secret_key,
                get_http_client(base_url),
                base_url,
            ),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(&self, messages: &[Message]) -> Result<Message, RemoteCallError> {
        let content = send_and_track(
            &self.client,
            &self.model,
            to_chat_messages(messages),
            Some(CHAT_COMPLETIONS_PATH.to_string()),
            &self.token_usage,
        )
        .await?;

        Ok(Message::assistant(content))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
