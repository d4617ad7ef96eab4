//! services/api/src/adapters/title_llm.rs
//!
//! OpenAI-backed implementation of the `TitleSuggestionService` port.
//! A leaf utility for the agency-side title brainstorm; the workflow
//! engine never calls it.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use review_portal_core::ports::{PortError, PortResult, TitleSuggestionService};

pub struct OpenAiTitleAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTitleAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl TitleSuggestionService for OpenAiTitleAdapter {
    async fn suggest_titles(&self, brief: &str, count: u8) -> PortResult<Vec<String>> {
        let preview = brief.chars().take(2000).collect::<String>();

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(format!(
                        "You are an editorial title assistant. Propose exactly {} alternative article titles for the given brief. Respond with one title per line, no numbering, no quotes, no explanation.",
                        count
                    ))
                    .build()
                    .map_err(|e| PortError::Store(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(format!("Propose titles for this article brief:\n\n{}", preview))
                    .build()
                    .map_err(|e| PortError::Store(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(200u32)
            .temperature(0.8)
            .build()
            .map_err(|e| PortError::Store(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PortError::Store(e.to_string()))?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Store("no titles generated".to_string()))?;

        let titles: Vec<String> = text
            .lines()
            .map(|l| l.trim().trim_matches('"').to_string())
            .filter(|l| !l.is_empty())
            .take(count as usize)
            .collect();

        if titles.is_empty() {
            return Err(PortError::Store("no titles generated".to_string()));
        }
        Ok(titles)
    }
}
