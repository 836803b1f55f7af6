/*!
 * Mock provider implementations for testing.
 *
 * This module provides a scriptable provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds, tagging every segment
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::fail_times(n)` - Fails `n` times, then succeeds
 * - `MockProvider::panicking()` - Panics inside the call
 *
 * Every call is counted and the peak number of calls in flight is recorded,
 * so tests can assert on retry counts and concurrency bounds.
 */

use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::translation::batch::SEGMENT_DELIMITER;
use crate::translation::core::Translator;

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// The text to translate
    pub text: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The translated text
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds, prefixing each delimited segment with `[pl] `
    Working,
    /// Always fails with an error
    Failing,
    /// Fails the first `failures` calls, then behaves like `Working`
    FailTimes { failures: usize },
    /// Always returns the same text
    Fixed(String),
    /// Returns an empty response
    Empty,
    /// Succeeds after a fixed delay
    Slow { delay_ms: u64 },
    /// Succeeds after a random delay up to `max_delay_ms`
    Jitter { max_delay_ms: u64 },
    /// Panics inside the call
    Panicking,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Number of calls made, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Calls currently in flight
    in_flight: Arc<AtomicUsize>,
    /// Highest number of calls observed in flight at once
    peak_in_flight: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
}

/// Decrements the in-flight counter when a call ends, panicking or not
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that fails `failures` times before succeeding
    pub fn fail_times(failures: usize) -> Self {
        Self::new(MockBehavior::FailTimes { failures })
    }

    /// Create a mock that always answers with `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fixed(text.into()))
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after a random delay
    pub fn jitter(max_delay_ms: u64) -> Self {
        Self::new(MockBehavior::Jitter { max_delay_ms })
    }

    /// Create a mock that panics on every call
    pub fn panicking() -> Self {
        Self::new(MockBehavior::Panicking)
    }

    /// Set a custom response generator used in place of the default tagging
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of calls made so far
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Tag every delimited segment of a payload with `[pl] `
    pub fn tag_segments(text: &str) -> String {
        text.split(SEGMENT_DELIMITER)
            .map(|part| format!("[pl] {}", part))
            .collect::<Vec<_>>()
            .join(SEGMENT_DELIMITER)
    }

    fn success(&self, text: &str) -> MockResponse {
        let text = match self.custom_response {
            Some(generator) => generator(text),
            None => Self::tag_segments(text),
        };
        MockResponse { text }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        match &self.behavior {
            MockBehavior::Working => Ok(self.success(&request.text)),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::FailTimes { failures } => {
                if count < *failures {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.success(&request.text))
                }
            }

            MockBehavior::Fixed(text) => Ok(MockResponse { text: text.clone() }),

            MockBehavior::Empty => Ok(MockResponse { text: String::new() }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(self.success(&request.text))
            }

            MockBehavior::Jitter { max_delay_ms } => {
                let delay = rand::rng().random_range(0..=*max_delay_ms);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(self.success(&request.text))
            }

            MockBehavior::Panicking => panic!("Simulated provider panic"),
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated outage".to_string())),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}

#[async_trait]
impl Translator for MockProvider {
    async fn translate(&self, text: &str) -> Result<String, ProviderError> {
        let response = self.complete(MockRequest { text: text.to_string() }).await?;
        Ok(Self::extract_text(&response))
    }
}
