/*!
 * Core translation service implementation.
 *
 * This module defines the `Translator` capability used by the fragment tasks
 * and the `TranslationService` that implements it on top of one configured
 * AI provider.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::Provider;
use super::cache::TranslationCache;

/// Single-string translation capability.
///
/// Implementations must be safe to call concurrently from many fragment tasks.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one payload, returning the provider's raw answer
    async fn translate(&self, text: &str) -> Result<String, ProviderError>;
}

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Number of provider requests
    pub requests: u64,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            requests: 0,
            api_duration: Duration::ZERO,
            provider,
            model,
        }
    }

    /// Record one completed request
    pub fn record(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>, duration: Duration) {
        self.prompt_tokens += prompt_tokens.unwrap_or(0);
        self.completion_tokens += completion_tokens.unwrap_or(0);
        self.requests += 1;
        self.api_duration += duration;
    }

    /// Total tokens used
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Generate a one-line summary of token usage
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} requests, {} prompt + {} completion = {} tokens, {:.1}s in API calls",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens(),
            self.api_duration.as_secs_f64()
        )
    }
}

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    /// OpenAI API service
    OpenAI { client: OpenAI },

    /// LM Studio local server (OpenAI-compatible)
    LMStudio { client: OpenAI },

    /// Anthropic API service
    Anthropic { client: Anthropic },

    /// Ollama local service
    Ollama { client: Ollama },
}

/// Translation service backed by one configured provider
#[derive(Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    /// System prompt with language placeholders resolved
    system_prompt: String,

    /// Translation cache for identical payloads
    pub cache: TranslationCache,

    /// Accumulated token usage
    usage: Mutex<TokenUsageStats>,
}

/// Resolve `{source_language}` and `{target_language}` in a prompt template
pub fn render_system_prompt(template: &str, source_language: &str, target_language: &str) -> String {
    let source_name = language_utils::get_language_name(source_language)
        .unwrap_or_else(|_| source_language.to_string());
    let target_name = language_utils::get_language_name(target_language)
        .unwrap_or_else(|_| target_language.to_string());

    template
        .replace("{source_language}", &source_name)
        .replace("{target_language}", &target_name)
}

/// Wrap a payload in the user instruction sent to the provider
pub fn user_message(text: &str) -> String {
    format!("Translate the following text:\n\n{}", text)
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig, source_language: &str, target_language: &str) -> Result<Self> {
        let timeout_secs = config.get_timeout_secs();
        let provider = match config.provider {
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::with_timeout(config.get_api_key(), config.get_endpoint(), timeout_secs),
            },
            ConfigTranslationProvider::LMStudio => {
                // LM Studio doesn't check the key but the header must be present
                let api_key = {
                    let k = config.get_api_key();
                    if k.is_empty() { "lm-studio".to_string() } else { k }
                };
                TranslationProviderImpl::LMStudio {
                    client: OpenAI::with_timeout(api_key, config.get_endpoint(), timeout_secs),
                }
            }
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::with_timeout(config.get_api_key(), config.get_endpoint(), timeout_secs)
                    .connection_test_model(config.get_model()),
            },
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::new(config.get_endpoint(), timeout_secs),
            },
        };

        let system_prompt = render_system_prompt(&config.common.system_prompt, source_language, target_language);
        let usage = TokenUsageStats::with_provider_info(
            config.provider.display_name().to_string(),
            config.get_model(),
        );

        Ok(Self {
            provider,
            config,
            system_prompt,
            cache: TranslationCache::new(true),
            usage: Mutex::new(usage),
        })
    }

    /// System prompt sent with every request
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Snapshot of the accumulated token usage
    pub fn token_usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<()> {
        debug!(
            "Testing connection to {} with model {}",
            self.config.provider.display_name(),
            self.config.get_model()
        );

        let result = match &self.provider {
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                client.test_connection().await
            }
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
            TranslationProviderImpl::Ollama { client } => client.test_connection().await,
        };

        result.with_context(|| {
            format!(
                "Failed to connect to {} at {}",
                self.config.provider.display_name(),
                self.config.get_endpoint()
            )
        })
    }

    /// Send one request to the provider, returning text and token counts
    async fn request(&self, text: &str) -> Result<(String, Option<u64>, Option<u64>), ProviderError> {
        let model = self.config.get_model();
        let temperature = self.config.common.temperature;

        match &self.provider {
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                let request = OpenAIRequest::new(model)
                    .add_message("system", &self.system_prompt)
                    .add_message("user", user_message(text))
                    .temperature(temperature);

                let response = client.complete(request).await?;
                let (prompt_tokens, completion_tokens) = match response.usage.as_ref() {
                    Some(usage) => (Some(usage.prompt_tokens as u64), Some(usage.completion_tokens as u64)),
                    None => (None, None),
                };
                Ok((OpenAI::extract_text(&response), prompt_tokens, completion_tokens))
            }
            TranslationProviderImpl::Anthropic { client } => {
                let max_tokens = max_tokens_for_model(&model);
                let request = AnthropicRequest::new(model, max_tokens)
                    .system(&self.system_prompt)
                    .add_message("user", user_message(text))
                    .temperature(temperature);

                let response = client.complete(request).await?;
                Ok((
                    Anthropic::extract_text(&response),
                    Some(response.usage.input_tokens as u64),
                    Some(response.usage.output_tokens as u64),
                ))
            }
            TranslationProviderImpl::Ollama { client } => {
                let request = GenerationRequest::new(model, user_message(text))
                    .system(&self.system_prompt)
                    .temperature(temperature);

                let response = client.complete(request).await?;
                Ok((Ollama::extract_text(&response), response.prompt_eval_count, response.eval_count))
            }
        }
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate(&self, text: &str) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        if let Some(cached) = self.cache.get(text) {
            return Ok(cached);
        }

        debug!("Sending {} characters to {}", text.chars().count(), self.config.provider.display_name());
        let start_time = Instant::now();
        let (translated, prompt_tokens, completion_tokens) = self.request(text).await?;
        let duration = start_time.elapsed();

        self.usage.lock().record(prompt_tokens, completion_tokens, duration);
        debug!("Received {} characters in {:?}", translated.chars().count(), duration);

        if translated.trim().is_empty() {
            return Err(ProviderError::ParseError("Provider returned an empty response".to_string()));
        }

        self.cache.store(text, &translated);
        Ok(translated)
    }
}

/// Get the maximum number of completion tokens to request for a model
fn max_tokens_for_model(model: &str) -> u32 {
    if model.starts_with("claude-3-5") || model.starts_with("claude-3-7") || model.contains("sonnet-4") || model.contains("opus-4") {
        8192
    } else {
        4096
    }
}
