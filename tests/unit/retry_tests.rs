/*!
 * Tests for the retry policy around a translator
 */

use std::sync::Arc;
use std::time::Duration;

use epubwai::providers::mock::MockProvider;
use epubwai::translation::{RetryPolicy, RetryingTranslator, DEFAULT_MAX_ATTEMPTS};

fn retrying(provider: &MockProvider, policy: RetryPolicy) -> RetryingTranslator {
    RetryingTranslator::new(Arc::new(provider.clone()), policy)
}

#[tokio::test]
async fn test_translate_withAlwaysFailingProvider_shouldStopAtMaxAttempts() {
    for max_attempts in 1..=5 {
        let provider = MockProvider::failing();
        let translator = retrying(&provider, RetryPolicy::new(max_attempts));

        assert_eq!(translator.translate("Hello").await, None);
        assert_eq!(provider.calls(), max_attempts as usize);
    }
}

#[tokio::test]
async fn test_translate_withTransientFailures_shouldStopAtFirstSuccess() {
    let provider = MockProvider::fail_times(1);
    let translator = retrying(&provider, RetryPolicy::default());

    assert_eq!(translator.translate("Hello").await.as_deref(), Some("[pl] Hello"));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_translate_withEmptyResponses_shouldTreatThemAsFailures() {
    let provider = MockProvider::empty();
    let translator = retrying(&provider, RetryPolicy::default());

    assert_eq!(translator.translate("Hello").await, None);
    assert_eq!(provider.calls(), DEFAULT_MAX_ATTEMPTS as usize);
}

#[tokio::test]
async fn test_translate_with_retry_withZeroAttempts_shouldStillCallOnce() {
    let provider = MockProvider::failing();
    let translator = retrying(&provider, RetryPolicy::default());

    assert_eq!(translator.translate_with_retry("Hello", 0).await, None);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_translate_withBlankInput_shouldNotCallProvider() {
    let provider = MockProvider::failing();
    let translator = retrying(&provider, RetryPolicy::default());

    assert_eq!(translator.translate(" \n\t ").await.as_deref(), Some(""));
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_backoff_delay_shouldGrowExponentiallyWithBoundedJitter() {
    let policy = RetryPolicy::new(4).with_backoff_ms(100);

    for _ in 0..20 {
        let first = policy.backoff_delay(1);
        let third = policy.backoff_delay(3);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(150));
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(450));
    }
    assert_eq!(RetryPolicy::default().backoff_delay(2), Duration::ZERO);
}
