//! Incremental decoding of streamed chat completions.
//!
//! OpenAI-compatible endpoints stream server-sent events, one
//! `data: {json}` line per fragment, terminated by `data: [DONE]`.
//! [`SseDecoder`] turns raw byte chunks into typed [`StreamEvent`]s and
//! [`decode_stream`] lifts a byte stream into a stream of those events.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::llm::ModelError;

/// Marker line payload ending a stream.
const DONE_MARKER: &str = "[DONE]";

/// One decoded element of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of generated text.
    Delta(String),
    /// A `data:` line that did not parse as a completion chunk.
    Malformed { line: String, reason: String },
    /// Explicit end of stream.
    Done,
}

/// Lazy, finite stream of events. Ends after `Done` or the first error.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ModelError>> + Send>>;

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Line-buffering decoder for server-sent completion events.
///
/// Bytes are buffered until a newline arrives, so lines (and multi-byte
/// characters) split across chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the events of every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the byte stream has ended.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }
}

fn decode_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == DONE_MARKER {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<Chunk>(payload) {
        Ok(chunk) => {
            let text: String = chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();
            (!text.is_empty()).then_some(StreamEvent::Delta(text))
        }
        Err(e) => Some(StreamEvent::Malformed {
            line: payload.to_string(),
            reason: e.to_string(),
        }),
    }
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    exhausted: bool,
}

/// Decode a stream of byte chunks into completion events.
///
/// A transport error is yielded once and ends the stream, as does `Done`.
/// If the bytes run out without `Done`, the stream simply ends.
pub fn decode_stream<S, B, E>(bytes: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                if event == StreamEvent::Done {
                    state.pending.clear();
                    state.exhausted = true;
                }
                return Some((Ok(event), state));
            }
            if state.exhausted {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.feed(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    return Some((Err(ModelError::Transport(e.to_string())), state));
                }
                None => {
                    state.exhausted = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(text).unwrap()
        )
    }

    #[test]
    fn test_decodes_deltas_and_done() {
        let mut decoder = SseDecoder::new();
        let input = format!("{}{}data: [DONE]\n\n", delta("Hello"), delta(", judges"));
        let events = decoder.feed(input.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("Hello".into()),
                StreamEvent::Delta(", judges".into()),
                StreamEvent::Done,
            ]
        );
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let input = delta("héllo");
        let bytes = input.as_bytes();
        // Split inside the multi-byte character.
        let split = input.find('é').unwrap() + 1;

        assert!(decoder.feed(&bytes[..split]).is_empty());
        assert_eq!(
            decoder.feed(&bytes[split..]),
            vec![StreamEvent::Delta("héllo".into())]
        );
    }

    #[test]
    fn test_ignores_comments_blank_and_role_only_chunks() {
        let mut decoder = SseDecoder::new();
        let input = ": OPENROUTER PROCESSING\r\n\r\nevent: ping\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n";
        assert!(decoder.feed(input.as_bytes()).is_empty());
    }

    #[test]
    fn test_malformed_line_is_reported_not_fatal() {
        let mut decoder = SseDecoder::new();
        let input = format!("data: {{not json\n{}", delta("ok"));
        let events = decoder.feed(input.as_bytes());
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Malformed { line, .. } if line == "{not json"));
        assert_eq!(events[1], StreamEvent::Delta("ok".into()));
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), vec![StreamEvent::Done]);
        assert!(decoder.finish().is_empty());
    }

    #[tokio::test]
    async fn test_decode_stream_stops_after_done() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(delta("a").into_bytes()),
            Ok(b"data: [DONE]\n".to_vec()),
            Ok(delta("ignored").into_bytes()),
        ];
        let events: Vec<_> = decode_stream(stream::iter(chunks)).collect().await;
        let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(events, vec![StreamEvent::Delta("a".into()), StreamEvent::Done]);
    }

    #[tokio::test]
    async fn test_decode_stream_surfaces_transport_error_once() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(delta("partial").into_bytes()),
            Err("connection reset".to_string()),
            Ok(delta("never").into_bytes()),
        ];
        let events: Vec<_> = decode_stream(stream::iter(chunks)).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap(), &StreamEvent::Delta("partial".into()));
        assert!(matches!(&events[1], Err(ModelError::Transport(msg)) if msg == "connection reset"));
    }

    #[tokio::test]
    async fn test_decode_stream_ends_without_done_marker() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![Ok(delta("tail").into_bytes())];
        let events: Vec<_> = decode_stream(stream::iter(chunks)).collect().await;
        assert_eq!(events.len(), 1);
    }
}
