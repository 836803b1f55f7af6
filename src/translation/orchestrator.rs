/*!
 * Concurrent, order-preserving fragment translation.
 *
 * Up to `workers` fragment tasks make progress at the same time. Results are
 * consumed by a single aggregator that owns the slot vector, so output order
 * always equals input order no matter which task finishes first.
 */

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use log::{debug, error, info};
use std::any::Any;
use std::panic::AssertUnwindSafe;

use super::fragment::{Fragment, FragmentOutcome, FragmentTranslationTask, TranslatedFragment};

/// Default number of concurrently translated fragments
pub const DEFAULT_WORKERS: usize = 10;

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestrationReport {
    /// Number of fragments processed
    pub total: usize,
    /// Fragments translated completely
    pub translated: usize,
    /// Fragments translated with some segments left in the original
    pub partial: usize,
    /// Fragments without translatable text
    pub no_text: usize,
    /// Fragments kept in the original after translation failed
    pub fallback: usize,
    /// Fragments kept in the original after the task panicked
    pub faulted: usize,
}

impl OrchestrationReport {
    /// Tally outcomes of a finished run
    pub fn from_results(results: &[TranslatedFragment]) -> Self {
        let mut report = Self { total: results.len(), ..Self::default() };
        for result in results {
            match result.outcome {
                FragmentOutcome::Translated { segments, translated_parts } if translated_parts < segments => {
                    report.partial += 1
                }
                FragmentOutcome::Translated { .. } => report.translated += 1,
                FragmentOutcome::NoText => report.no_text += 1,
                FragmentOutcome::Fallback => report.fallback += 1,
                FragmentOutcome::Faulted => report.faulted += 1,
            }
        }
        report
    }

    /// Number of fragments whose output is the original because of a failure
    pub fn failures(&self) -> usize {
        self.fallback + self.faulted
    }
}

/// Runs fragment tasks over a bounded pool and collects results in input order
#[derive(Clone)]
pub struct ConcurrentOrchestrator {
    task: FragmentTranslationTask,
    workers: usize,
}

impl ConcurrentOrchestrator {
    /// Create an orchestrator; worker counts below 1 are raised to 1
    pub fn new(task: FragmentTranslationTask, workers: usize) -> Self {
        Self {
            task,
            workers: workers.max(1),
        }
    }

    /// Effective worker bound
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Translate all fragments without progress reporting
    pub async fn run(&self, fragments: &[Fragment]) -> Vec<TranslatedFragment> {
        self.run_with_progress(fragments, |_, _| {}).await
    }

    /// Translate all fragments, reporting `(completed, total)` after every result
    pub async fn run_with_progress<F>(&self, fragments: &[Fragment], mut progress: F) -> Vec<TranslatedFragment>
    where
        F: FnMut(usize, usize),
    {
        let total = fragments.len();
        info!("Translating {} documents with {} workers", total, self.workers);

        let mut slots: Vec<Option<TranslatedFragment>> = (0..total).map(|_| None).collect();
        let task = &self.task;

        let mut completions = stream::iter(fragments.iter().enumerate())
            .map(|(index, fragment)| async move {
                let result = AssertUnwindSafe(task.run(fragment)).catch_unwind().await;
                (index, result)
            })
            .buffer_unordered(self.workers);

        let mut completed = 0;
        while let Some((index, result)) = completions.next().await {
            let translated = match result {
                Ok(translated) => translated,
                Err(panic) => {
                    error!(
                        "{}: translation task panicked ({}), keeping original content",
                        fragments[index].href,
                        panic_message(panic.as_ref())
                    );
                    TranslatedFragment::unchanged(&fragments[index], FragmentOutcome::Faulted)
                }
            };

            debug!("{}: {}", translated.href, translated.outcome);
            debug_assert!(slots[index].is_none(), "slot {} filled twice", index);
            slots[index] = Some(translated);
            completed += 1;
            progress(completed, total);
        }

        slots
            .into_iter()
            .zip(fragments)
            .map(|(slot, fragment)| {
                slot.unwrap_or_else(|| TranslatedFragment::unchanged(fragment, FragmentOutcome::Faulted))
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
