/*!
 * Structure-preserving translation of markup documents.
 *
 * This module contains the core translation pipeline, split into submodules:
 *
 * - `segments`: Extraction of text segments and in-place reassembly
 * - `batch`: Joining segments into one payload and splitting it back
 * - `core`: The `Translator` capability and the provider-backed service
 * - `retry`: Bounded retry around a translator
 * - `fragment`: Per-document translation task
 * - `orchestrator`: Concurrent, order-preserving execution of tasks
 * - `cache`: Caching of identical payloads
 */

// Re-export main types for easier usage
pub use self::batch::{BatchCodec, SEGMENT_DELIMITER};
pub use self::core::{TokenUsageStats, TranslationService, Translator};
pub use self::fragment::{Fragment, FragmentOutcome, FragmentTranslationTask, TranslatedFragment};
pub use self::orchestrator::{ConcurrentOrchestrator, OrchestrationReport, DEFAULT_WORKERS};
pub use self::retry::{RetryPolicy, RetryingTranslator, DEFAULT_MAX_ATTEMPTS};
pub use self::segments::{ExtractedDocument, Segment, SegmentExtractor};

// Submodules
pub mod batch;
pub mod cache;
pub mod core;
pub mod fragment;
pub mod orchestrator;
pub mod retry;
pub mod segments;
