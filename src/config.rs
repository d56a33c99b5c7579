use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Which OpenAI-compatible backend serves chat completions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmBackend {
    /// Local llama.cpp-style server (default)
    Local,
    OpenAi,
    Cohere,
}

impl LlmBackend {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "openai" => LlmBackend::OpenAi,
            "cohere" => LlmBackend::Cohere,
            _ => LlmBackend::Local,
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            LlmBackend::Local => "http://localhost:8080/v1",
            LlmBackend::OpenAi => "https://api.openai.com/v1",
            LlmBackend::Cohere => "https://api.cohere.ai/compatibility/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmBackend::Local => "local-model",
            LlmBackend::OpenAi => "gpt-4o",
            LlmBackend::Cohere => "command-r-plus",
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,
    pub llm_backend: LlmBackend,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub persist_dir: PathBuf,
    /// Size of the short-term context window (the triggering message is excluded)
    pub last_n_messages: usize,
    pub similarity_top_k: usize,
    pub recency_top_k: usize,
    pub llm_timeout_secs: u64,
    pub embedding_timeout_secs: u64,
    pub vector_timeout_secs: u64,
    /// Extra attempts for transient vector-store transport errors
    pub vector_retries: u32,
    pub status_message: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        let backend =
            LlmBackend::parse(&env::var("LLM_BACKEND").unwrap_or_else(|_| "local".to_string()));

        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            qdrant_url: env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            qdrant_api_key: env::var("QDRANT_API_KEY").ok(),
            qdrant_collection: env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| "discord_llamabot".to_string()),
            llm_backend: backend,
            llm_url: env::var("LLM_URL").unwrap_or_else(|_| backend.default_url().to_string()),
            llm_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| backend.default_model().to_string()),
            llm_api_key: env::var("LLM_API_KEY").ok(),
            embedding_url: env::var("EMBEDDING_URL").unwrap_or_else(|_| {
                env::var("LLM_URL").unwrap_or_else(|_| backend.default_url().to_string())
            }),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "local-model".to_string()),
            embedding_api_key: env::var("EMBEDDING_API_KEY").ok(),
            persist_dir: PathBuf::from(
                env::var("PERSIST_DIR").unwrap_or_else(|_| ".persist".to_string()),
            ),
            last_n_messages: env::var("LAST_N_MESSAGES")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .unwrap_or(6),
            similarity_top_k: env::var("SIMILARITY_TOP_K")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
            recency_top_k: env::var("RECENCY_TOP_K")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
            llm_timeout_secs: env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            embedding_timeout_secs: env::var("EMBEDDING_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            vector_timeout_secs: env::var("VECTOR_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            vector_retries: env::var("VECTOR_RETRIES")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Listening between the lines".to_string()),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("qdrant_url", &self.qdrant_url)
            .field(
                "qdrant_api_key",
                &self.qdrant_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("qdrant_collection", &self.qdrant_collection)
            .field("llm_backend", &self.llm_backend)
            .field("llm_url", &self.llm_url)
            .field("llm_model", &self.llm_model)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("embedding_url", &self.embedding_url)
            .field("embedding_model", &self.embedding_model)
            .field(
                "embedding_api_key",
                &self.embedding_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("persist_dir", &self.persist_dir)
            .field("last_n_messages", &self.last_n_messages)
            .field("similarity_top_k", &self.similarity_top_k)
            .field("recency_top_k", &self.recency_top_k)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("embedding_timeout_secs", &self.embedding_timeout_secs)
            .field("vector_timeout_secs", &self.vector_timeout_secs)
            .field("vector_retries", &self.vector_retries)
            .field("status_message", &self.status_message)
            .finish()
    }
}

/// Discord message limit is 2000 characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_logic() {
        // 1. Test missing vars
        env::remove_var("DISCORD_TOKEN");
        let result = Config::build();
        assert!(result.is_err(), "Should fail when DISCORD_TOKEN is missing");

        // 2. Test defaults
        env::set_var("DISCORD_TOKEN", "test_token");
        let config = Config::build().unwrap();
        assert_eq!(config.discord_token, "test_token");
        assert_eq!(config.qdrant_collection, "discord_llamabot");
        assert_eq!(config.llm_backend, LlmBackend::Local);
        assert_eq!(config.last_n_messages, 6);
        assert_eq!(config.similarity_top_k, 8);
        assert_eq!(config.vector_retries, 1);

        // 3. Test debug redaction
        env::set_var("LLM_API_KEY", "secret_api_key");
        env::set_var("QDRANT_API_KEY", "secret_qdrant_key");
        let config_redacted = Config::build().unwrap();
        let debug_output = format!("{:?}", config_redacted);
        assert!(!debug_output.contains("test_token"));
        assert!(!debug_output.contains("secret_api_key"));
        assert!(!debug_output.contains("secret_qdrant_key"));
        assert!(debug_output.contains("[REDACTED]"));

        // 4. Backend selection drives endpoint defaults
        env::set_var("LLM_BACKEND", "openai");
        let config_openai = Config::build().unwrap();
        assert_eq!(config_openai.llm_backend, LlmBackend::OpenAi);
        assert_eq!(config_openai.llm_url, "https://api.openai.com/v1");

        // Cleanup
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("LLM_API_KEY");
        env::remove_var("QDRANT_API_KEY");
        env::remove_var("LLM_BACKEND");
    }
}
