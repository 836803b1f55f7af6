/*!
 * Per-fragment translation unit.
 *
 * A task extracts the text segments of one markup fragment, sends them as a
 * single batch payload through the retrying translator, and writes the
 * translated parts back into the source markup. The task always produces a
 * `TranslatedFragment`; any failure degrades to the original content.
 */

use log::{debug, warn};
use std::fmt;

use super::batch::BatchCodec;
use super::retry::RetryingTranslator;
use super::segments::{ExtractedDocument, SegmentExtractor};
use crate::errors::TranslationError;

/// One translatable document of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Stable identity within the container
    pub id: String,
    /// Location inside the container, informational only
    pub href: String,
    /// Raw markup
    pub content: String,
}

impl Fragment {
    /// Create a new fragment
    pub fn new(id: impl Into<String>, href: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            content: content.into(),
        }
    }
}

/// How a fragment's output content was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Translated; `translated_parts` of `segments` were replaced
    Translated { segments: usize, translated_parts: usize },
    /// No translatable text; content unchanged
    NoText,
    /// Translation failed after all attempts; original content kept
    Fallback,
    /// The task panicked; original content kept
    Faulted,
}

impl FragmentOutcome {
    /// Whether the output is the untouched original because of a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fallback | Self::Faulted)
    }
}

impl fmt::Display for FragmentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translated { segments, translated_parts } if translated_parts < segments => {
                write!(f, "translated {}/{} segments", translated_parts, segments)
            }
            Self::Translated { segments, .. } => write!(f, "translated {} segments", segments),
            Self::NoText => write!(f, "no text"),
            Self::Fallback => write!(f, "translation failed, original kept"),
            Self::Faulted => write!(f, "task faulted, original kept"),
        }
    }
}

/// Result of translating one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedFragment {
    /// Identity copied from the input fragment
    pub id: String,
    /// Location copied from the input fragment
    pub href: String,
    /// Output markup
    pub translated_content: String,
    /// How the output was obtained
    pub outcome: FragmentOutcome,
}

impl TranslatedFragment {
    /// Output that carries the original content unchanged
    pub fn unchanged(fragment: &Fragment, outcome: FragmentOutcome) -> Self {
        Self {
            id: fragment.id.clone(),
            href: fragment.href.clone(),
            translated_content: fragment.content.clone(),
            outcome,
        }
    }
}

/// Translates one fragment: extract, batch, translate, split, reinsert
#[derive(Clone)]
pub struct FragmentTranslationTask {
    translator: RetryingTranslator,
    codec: BatchCodec,
    extractor: SegmentExtractor,
}

impl FragmentTranslationTask {
    /// Create a task with the default codec and extractor
    pub fn new(translator: RetryingTranslator) -> Self {
        Self {
            translator,
            codec: BatchCodec::default(),
            extractor: SegmentExtractor::default(),
        }
    }

    /// Use a custom batch codec
    pub fn with_codec(mut self, codec: BatchCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Use a custom segment extractor
    pub fn with_extractor(mut self, extractor: SegmentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Translate a fragment. Never fails.
    pub async fn run(&self, fragment: &Fragment) -> TranslatedFragment {
        let mut document = match ExtractedDocument::parse_with(&fragment.content, &self.extractor) {
            Ok(document) => document,
            Err(e) => {
                let error = TranslationError::Markup { href: fragment.href.clone(), message: e.to_string() };
                warn!("{}, keeping original content", error);
                return TranslatedFragment::unchanged(fragment, FragmentOutcome::Fallback);
            }
        };
        if document.is_empty() {
            debug!("{}: no translatable text", fragment.href);
            return TranslatedFragment::unchanged(fragment, FragmentOutcome::NoText);
        }

        let segment_count = document.len();
        let payload = {
            let texts = document.segment_texts();
            if texts.iter().any(|text| self.codec.collides_with(text)) {
                warn!("{}: source text contains the segment separator, alignment may shift", fragment.href);
            }
            self.codec.join(&texts)
        };

        debug!("{}: translating {} segments", fragment.href, segment_count);
        let Some(translated) = self.translator.translate(&payload).await else {
            warn!("{}: translation failed, keeping original content", fragment.href);
            return TranslatedFragment::unchanged(fragment, FragmentOutcome::Fallback);
        };

        let parts = self.codec.split(&translated, segment_count);
        if parts.len() != segment_count {
            debug!(
                "{}: expected {} parts, got {}; remaining segments keep original text",
                fragment.href, segment_count, parts.len()
            );
        }

        let translated_parts = document.apply_translations(&parts);
        TranslatedFragment {
            id: fragment.id.clone(),
            href: fragment.href.clone(),
            translated_content: document.to_markup(),
            outcome: FragmentOutcome::Translated { segments: segment_count, translated_parts },
        }
    }
}
