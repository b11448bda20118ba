//! Result segments: borrowed views over engine-owned storage, plus an owned
//! form for callers that keep results around.

use std::borrow::Cow;
use std::ffi::CStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transcriber::Transcriber;

/// One transcribed span, borrowed from the context's result storage.
///
/// The text lives inside the engine context. The borrow on [`Transcriber`]
/// is what keeps it valid: the next `transcribe` call takes `&mut self`, so
/// the compiler refuses it while any `Segment` is still alive.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub(crate) text: &'a CStr,
    pub(crate) start: i64,
    pub(crate) end: i64,
}

impl<'a> Segment<'a> {
    /// Segment text, lossily decoded. The engine emits UTF-8, but a token
    /// boundary can split a multi-byte sequence across segments.
    pub fn text(&self) -> Cow<'a, str> {
        self.text.to_string_lossy()
    }

    /// Raw text bytes exactly as the engine produced them.
    pub fn text_bytes(&self) -> &'a [u8] {
        self.text.to_bytes()
    }

    /// Start offset in centiseconds from the beginning of the sample buffer.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// End offset in centiseconds.
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Start offset as a [`Duration`].
    pub fn start_time(&self) -> Duration {
        centis_to_duration(self.start)
    }

    /// End offset as a [`Duration`].
    pub fn end_time(&self) -> Duration {
        centis_to_duration(self.end)
    }
}

/// Iterator over a context's segments in index order.
pub struct Segments<'a> {
    pub(crate) inner: &'a Transcriber,
    pub(crate) index: usize,
    pub(crate) count: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let segment = self.inner.segment(self.index);
        self.index += 1;
        segment
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Segments<'_> {}

/// Owned copy of a segment, detached from the context. This is what callers
/// keep past the next transcription, and the payload type of the helper
/// protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Centiseconds from the start of the sample buffer.
    pub start: i64,
    /// Centiseconds from the start of the sample buffer.
    pub end: i64,
}

impl TranscriptSegment {
    pub fn start_time(&self) -> Duration {
        centis_to_duration(self.start)
    }

    pub fn end_time(&self) -> Duration {
        centis_to_duration(self.end)
    }
}

impl From<Segment<'_>> for TranscriptSegment {
    fn from(segment: Segment<'_>) -> Self {
        Self {
            text: segment.text().into_owned(),
            start: segment.start,
            end: segment.end,
        }
    }
}

fn centis_to_duration(centis: i64) -> Duration {
    Duration::from_millis((centis.max(0) as u64).saturating_mul(10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centiseconds_convert_to_durations() {
        let segment = TranscriptSegment {
            text: "hello".into(),
            start: 150,
            end: 425,
        };
        assert_eq!(segment.start_time(), Duration::from_millis(1500));
        assert_eq!(segment.end_time(), Duration::from_millis(4250));
    }

    #[test]
    fn negative_timestamps_clamp_to_zero() {
        let segment = TranscriptSegment {
            text: String::new(),
            start: -1,
            end: 0,
        };
        assert_eq!(segment.start_time(), Duration::ZERO);
        assert_eq!(segment.end_time(), Duration::ZERO);
    }

    #[test]
    fn segments_serialize_for_the_protocol() {
        let json = serde_json::to_string(&TranscriptSegment {
            text: "ok".into(),
            start: 0,
            end: 80,
        })
        .unwrap();
        assert_eq!(json, r#"{"text":"ok","start":0,"end":80}"#);
    }
}
