use crate::client_wrapper::{ClientWrapper, Message, RemoteCallError, TokenUsage};
use crate::clients::openai::OpenAIClient;
use async_trait::async_trait;
use std::sync::Mutex;

/// xAI's OpenAI compatible endpoint.
pub const XAI_BASE_URL: &str = "https://api.x.ai/v1";

/// xAI hosts Grok behind an OpenAI compatible API, so this is a thin delegate.
pub struct GrokClient {
    client: OpenAIClient,
}

pub enum Model {
    Grok2,
    Grok2Latest,
    Grok21212,         // the secretary's default planner
    Grok3MiniFastBeta, // $0.60/MMT input $4.00/MMT output
    Grok3Beta,
}

pub fn model_to_string(model: Model) -> String {
    match model {
        Model::Grok2 => "grok-2".to_string(),
        Model::Grok2Latest => "grok-2-latest".to_string(),
        Model::Grok21212 => "grok-2-1212".to_string(),
        Model::Grok3MiniFastBeta => "grok-3-mini-fast-beta".to_string(),
        Model::Grok3Beta => "grok-3-beta".to_string(),
    }
}

impl GrokClient {
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        GrokClient {
            client: OpenAIClient::new_with_base_url(secret_key, model_name, XAI_BASE_URL),
        }
    }
}

#[async_trait]
impl ClientWrapper for GrokClient {
    fn model_name(&self) -> &str {
        self.client.model_name()
    }

    async fn send_message(&self, messages: &[Message]) -> Result<Message, RemoteCallError> {
        self.client.send_message(messages).await
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        self.client.usage_slot()
    }
}

#[test]
fn grok_model_names_match_the_api() {
    assert_eq!(model_to_string(Model::Grok21212), "grok-2-1212");
    let client = GrokClient::new_with_model_enum("test-key", Model::Grok3MiniFastBeta);
    assert_eq!(client.model_name(), "grok-3-mini-fast-beta");
}
