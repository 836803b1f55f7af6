/*!
 * Bounded retry around a translation capability.
 *
 * A call counts as failed when the capability errors or answers with blank
 * text. Failures never escape: after the last attempt the caller gets `None`.
 */

use log::{debug, warn};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use super::core::Translator;
use crate::errors::TranslationError;

/// Default number of attempts per payload
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of calls per payload (values below 1 behave as 1)
    pub max_attempts: u32,

    /// Base backoff in milliseconds, doubled after each failed attempt (0 disables)
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: 0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt count and no backoff
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_base_ms: 0,
        }
    }

    /// Set the base backoff
    pub fn with_backoff_ms(mut self, backoff_base_ms: u64) -> Self {
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if self.backoff_base_ms == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.backoff_base_ms.saturating_mul(1u64 << exponent);
        let jitter = rand::rng().random_range(0..=self.backoff_base_ms / 2);
        Duration::from_millis(base.saturating_add(jitter))
    }
}

/// Translator wrapper that retries failed calls
#[derive(Clone)]
pub struct RetryingTranslator {
    translator: Arc<dyn Translator>,
    policy: RetryPolicy,
}

impl RetryingTranslator {
    /// Wrap a translator with a retry policy
    pub fn new(translator: Arc<dyn Translator>, policy: RetryPolicy) -> Self {
        Self { translator, policy }
    }

    /// The policy in use
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Translate using the configured attempt count
    pub async fn translate(&self, text: &str) -> Option<String> {
        self.translate_with_retry(text, self.policy.max_attempts).await
    }

    /// Translate with up to `max_attempts` calls.
    ///
    /// Blank input returns `Some("")` without calling the capability. The
    /// payload is sent unchanged on every attempt.
    pub async fn translate_with_retry(&self, text: &str, max_attempts: u32) -> Option<String> {
        if text.trim().is_empty() {
            return Some(String::new());
        }

        let max_attempts = max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.translator.translate(text).await {
                Ok(translated) if !translated.trim().is_empty() => {
                    if attempt > 1 {
                        debug!("Translation succeeded on attempt {}/{}", attempt, max_attempts);
                    }
                    return Some(translated);
                }
                Ok(_) => {
                    warn!("Empty translation on attempt {}/{}", attempt, max_attempts);
                }
                Err(e) => {
                    warn!("Translation attempt {}/{} failed: {}", attempt, max_attempts, e);
                }
            }

            if attempt < max_attempts {
                let delay = self.policy.backoff_delay(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        warn!("{}", TranslationError::RetriesExhausted { attempts: max_attempts });
        None
    }
}
