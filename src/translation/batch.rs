/*!
 * Batch payload encoding.
 *
 * All segments of one fragment travel to the provider as a single payload,
 * joined by a reserved separator line. The translated payload is split on the
 * same separator and aligned back to the segments by position.
 *
 * The separator is assumed not to occur in source text. If it does, parts
 * shift and trailing segments are misaligned without any error being raised.
 */

/// Separator placed between segment texts in a batch payload
pub const SEGMENT_DELIMITER: &str = "\n---SEPARATOR---\n";

/// Joins segment texts into one payload and splits translated payloads back
#[derive(Debug, Clone)]
pub struct BatchCodec {
    delimiter: String,
}

impl Default for BatchCodec {
    fn default() -> Self {
        Self::new(SEGMENT_DELIMITER)
    }
}

impl BatchCodec {
    /// Create a codec with a custom delimiter
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self { delimiter: delimiter.into() }
    }

    /// The delimiter used between segments
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Join segment texts in order
    pub fn join<S: AsRef<str>>(&self, segments: &[S]) -> String {
        let mut payload = String::with_capacity(
            segments.iter().map(|s| s.as_ref().len() + self.delimiter.len()).sum(),
        );

        for (idx, segment) in segments.iter().enumerate() {
            if idx > 0 {
                payload.push_str(&self.delimiter);
            }
            payload.push_str(segment.as_ref());
        }

        payload
    }

    /// Split a translated payload into at most `expected_count` trimmed parts.
    ///
    /// Extra parts beyond `expected_count` are dropped. When fewer parts come
    /// back, only those are returned and the caller keeps original text for
    /// the rest.
    pub fn split(&self, payload: &str, expected_count: usize) -> Vec<String> {
        if expected_count == 0 {
            return Vec::new();
        }

        payload
            .split(self.delimiter.as_str())
            .take(expected_count)
            .map(|part| part.trim().to_string())
            .collect()
    }

    /// Whether the text would be cut apart by the delimiter
    pub fn collides_with(&self, text: &str) -> bool {
        text.contains(self.delimiter.as_str())
    }
}
