/*!
 * Segment extraction and in-place reassembly for markup fragments.
 *
 * Fragments are XHTML, so they are read as an XML event stream. The
 * extractor records the byte span of every translatable text run, and
 * reassembly splices translated text into those spans. Everything outside
 * a replaced span (tags, attributes, entities, the XML declaration,
 * self-closing elements) is written back byte for byte.
 */

use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::ops::Range;

/// Elements whose subtree never contains renderable text
pub const SKIP_ELEMENTS: &[&str] = &["script", "style"];

const BYTE_ORDER_MARK: char = '\u{feff}';

/// One translatable text run and its position in the source
#[derive(Debug, Clone)]
pub struct Segment {
    /// Trimmed, non-empty text with entities resolved
    pub text: String,
    /// Byte span of the trimmed raw text; surrounding whitespace stays outside it
    span: Range<usize>,
    translated: Option<String>,
}

impl Segment {
    fn from_raw(raw: &str, offset: usize) -> Option<Self> {
        let inner = raw.trim();
        if inner.is_empty() {
            return None;
        }

        // HTML5 named entities resolve too; text with an unknown one is left as it is
        let resolved = unescape(inner).ok()?;
        let text = resolved.trim();
        if text.is_empty() {
            return None;
        }

        let start = offset + (raw.len() - raw.trim_start().len());
        Some(Self {
            text: text.to_string(),
            span: start..start + inner.len(),
            translated: None,
        })
    }

    /// Whether a translation has been applied to this segment
    pub fn is_translated(&self) -> bool {
        self.translated.is_some()
    }
}

/// Walks an XML event stream and collects leaf text segments
#[derive(Debug, Clone)]
pub struct SegmentExtractor {
    skip_elements: Vec<String>,
}

impl Default for SegmentExtractor {
    fn default() -> Self {
        Self::new(SKIP_ELEMENTS.iter().map(|s| s.to_string()).collect())
    }
}

impl SegmentExtractor {
    /// Create an extractor that skips the given element names
    pub fn new(skip_elements: Vec<String>) -> Self {
        Self { skip_elements }
    }

    /// Collect all translatable segments of `markup` in document order
    pub fn extract(&self, markup: &str) -> Result<Vec<Segment>, quick_xml::Error> {
        let body_start = if markup.starts_with(BYTE_ORDER_MARK) { BYTE_ORDER_MARK.len_utf8() } else { 0 };
        let body = &markup[body_start..];

        let mut reader = Reader::from_str(body);
        reader.config_mut().check_end_names = false;

        // Open elements and whether text inside them is skipped
        let mut open: Vec<(String, bool)> = Vec::new();
        let mut segments = Vec::new();

        loop {
            let start = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    let skipped = open.last().is_some_and(|(_, skipped)| *skipped) || self.should_skip_element(&name);
                    open.push((name, skipped));
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if let Some(index) = open.iter().rposition(|(open_name, _)| open_name.eq_ignore_ascii_case(&name)) {
                        open.truncate(index);
                    }
                }
                Event::Text(_) if open.last().is_some_and(|(_, skipped)| *skipped) => {}
                Event::Text(_) => {
                    let end = reader.buffer_position() as usize;
                    if let Some(segment) = Segment::from_raw(&body[start..end], body_start + start) {
                        segments.push(segment);
                    }
                }
                Event::Eof => break,
                // Empty elements, comments, CDATA, doctypes and processing instructions
                _ => {}
            }
        }

        Ok(segments)
    }

    fn should_skip_element(&self, tag_name: &str) -> bool {
        self.skip_elements.iter().any(|skip| skip.eq_ignore_ascii_case(tag_name))
    }
}

/// A fragment's source together with its extracted segments
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    source: String,
    segments: Vec<Segment>,
}

impl ExtractedDocument {
    /// Parse markup and extract segments with the default extractor
    pub fn parse(markup: &str) -> Result<Self, quick_xml::Error> {
        Self::parse_with(markup, &SegmentExtractor::default())
    }

    /// Parse markup and extract segments with a custom extractor
    pub fn parse_with(markup: &str, extractor: &SegmentExtractor) -> Result<Self, quick_xml::Error> {
        let segments = extractor.extract(markup)?;
        Ok(Self {
            source: markup.to_string(),
            segments,
        })
    }

    /// Extracted segments in document order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Texts of all segments in document order
    pub fn segment_texts(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Number of extracted segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the document has nothing to translate
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Attach translated parts to the segments.
    ///
    /// Part `i` replaces segment `i`. Segments without a part keep their
    /// original text. Returns the number of segments replaced.
    pub fn apply_translations<S: AsRef<str>>(&mut self, parts: &[S]) -> usize {
        let mut replaced = 0;
        for (segment, part) in self.segments.iter_mut().zip(parts) {
            segment.translated = Some(part.as_ref().to_string());
            replaced += 1;
        }
        replaced
    }

    /// Rebuild the markup with translated text spliced in
    pub fn to_markup(&self) -> String {
        let mut markup = String::with_capacity(self.source.len());
        let mut cursor = 0;

        for segment in &self.segments {
            let Some(translated) = &segment.translated else {
                continue;
            };
            markup.push_str(&self.source[cursor..segment.span.start]);
            markup.push_str(&partial_escape(translated));
            cursor = segment.span.end;
        }

        markup.push_str(&self.source[cursor..]);
        markup
    }
}
