/*!
 * # EPUBwAI - EPUB translation with AI
 *
 * A Rust library for translating EPUB books with AI while keeping their
 * structure intact.
 *
 * ## Features
 *
 * - Extract translatable text segments from (X)HTML documents and put the
 *   translations back without touching markup
 * - Translate each document in a single request, segments joined by a delimiter
 * - Bounded retry with exponential backoff per document
 * - Concurrent translation of documents with results kept in book order
 * - Documents that cannot be translated keep their original content
 * - Providers:
 *   - OpenAI API
 *   - Anthropic API
 *   - Ollama (local LLM)
 *   - LM Studio (OpenAI compatible)
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `container`: EPUB reading, document replacement and writing
 * - `translation`: The translation pipeline:
 *   - `translation::segments`: Segment extraction and reassembly
 *   - `translation::batch`: Delimiter-joined request payloads
 *   - `translation::core`: Translator capability and provider-backed service
 *   - `translation::retry`: Retry policy
 *   - `translation::fragment`: Per-document translation task
 *   - `translation::orchestrator`: Concurrent, order-preserving execution
 *   - `translation::cache`: Caching of identical payloads
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Clients for the LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod container;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunOutcome};
pub use container::{DocumentContainer, EpubContainer};
pub use translation::{
    ConcurrentOrchestrator, Fragment, FragmentTranslationTask, RetryingTranslator,
    TranslatedFragment, TranslationService, Translator,
};
pub use language_utils::{get_language_name, language_codes_match};
pub use errors::{ContainerError, ProviderError, TranslationError};
