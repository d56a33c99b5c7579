use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs,
    },
    Client,
};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::Config;

pub struct LlmClient {
    chat_client: Client<OpenAIConfig>,
    embedding_client: Client<OpenAIConfig>,
    chat_model: String,
    embedding_model: String,
    chat_timeout: Duration,
    embedding_timeout: Duration,
}

impl LlmClient {
    pub fn new(config: &Config) -> Self {
        let mut chat_config = OpenAIConfig::new().with_api_base(&config.llm_url);
        if let Some(key) = &config.llm_api_key {
            chat_config = chat_config.with_api_key(key);
        } else {
            chat_config = chat_config.with_api_key("unused");
        }

        let mut embedding_config = OpenAIConfig::new().with_api_base(&config.embedding_url);
        if let Some(key) = &config.embedding_api_key {
            embedding_config = embedding_config.with_api_key(key);
        } else {
            embedding_config = embedding_config.with_api_key("unused");
        }

        Self {
            chat_client: Client::with_config(chat_config),
            embedding_client: Client::with_config(embedding_config),
            chat_model: config.llm_model.clone(),
            embedding_model: config.embedding_model.clone(),
            chat_timeout: Duration::from_secs(config.llm_timeout_secs),
            embedding_timeout: Duration::from_secs(config.embedding_timeout_secs),
        }
    }

    /// Send one fully-assembled prompt and return the completion text. The
    /// prompt template carries all instructions, so a single user message is
    /// enough.
    pub async fn chat(&self, prompt: &str) -> anyhow::Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()?
                .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .messages(messages)
            .build()?;

        let response = timeout(self.chat_timeout, self.chat_client.chat().create(request))
            .await
            .map_err(|_| anyhow::anyhow!("LLM call timed out"))??;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_else(|| "No response from LLM".to_string());

        Ok(content)
    }

    pub async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut embeddings = self.embed_many(vec![text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned"))
    }

    pub async fn embed_many(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(texts)
            .build()?;

        let response = timeout(
            self.embedding_timeout,
            self.embedding_client.embeddings().create(request),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Embedding call timed out"))??;

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Average several embeddings into one query vector. The retrieval query
/// embeds the question together with the recent channel messages so the
/// search also matches conversational continuations, not just the literal
/// question.
pub fn mean_vector(embeddings: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = embeddings.first() else {
        return Vec::new();
    };
    let dim = first.len();
    let mut mean = vec![0.0f32; dim];
    for embedding in embeddings {
        for (slot, value) in mean.iter_mut().zip(embedding.iter()) {
            *slot += value;
        }
    }
    let n = embeddings.len() as f32;
    for slot in &mut mean {
        *slot /= n;
    }
    mean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_single_vector_is_itself() {
        let v = vec![vec![1.0, 2.0, 3.0]];
        assert_eq!(mean_vector(&v), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn mean_averages_componentwise() {
        let v = vec![vec![1.0, 0.0], vec![3.0, 2.0]];
        assert_eq!(mean_vector(&v), vec![2.0, 1.0]);
    }

    #[test]
    fn mean_of_empty_is_empty() {
        assert!(mean_vector(&[]).is_empty());
    }
}
