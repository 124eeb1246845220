//! Server-Sent Events (SSE) decoding for chat-completion streams.
//!
//! Chat-completion providers answer a streaming request with a chunked body of lines, each of
//! them blank, `data: [DONE]`, or `data: <json>`.  Chunk boundaries fall anywhere, including in
//! the middle of a line or of a multi-byte character, so the decoder carries the incomplete tail
//! of every chunk over to the next one.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::error::Result;
use crate::observability::STREAM_BYTES;
use crate::types::{ChatCompletionChunk, StreamFrame};

/// Payload of the terminator line.
pub const DONE_MARKER: &str = "[DONE]";

const DATA_PREFIX: &str = "data:";

/// Incremental line decoder.
///
/// Feed it raw chunks with [`FrameDecoder::push`] and call [`FrameDecoder::finish`] once the
/// body has ended.  Frames come out in the order their lines arrived; no input makes it fail.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    pending: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    /// Create a decoder with an empty carry-over buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning the frames of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.decode_text(chunk);
        let Some(end) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(end + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete.split('\n').filter_map(decode_line).collect()
    }

    /// Decode whatever is left in the carry-over buffer.
    ///
    /// Only the first call does anything, so a remainder is never decoded twice.
    pub fn finish(&mut self) -> Option<StreamFrame> {
        if self.finished {
            return None;
        }
        self.finished = true;
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&pending));
        }
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Text that has not yet formed a complete line.
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    fn decode_text(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);
        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, after) = input.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.buffer.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &after[len..];
                        }
                        None => {
                            // Truncated sequence; the next chunk completes it.
                            self.pending = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Decode a single line.
///
/// Returns `None` for lines that carry nothing: blank lines, SSE comments and other fields, and
/// JSON without a string at `choices[0].delta.content`.  Only a payload that is not JSON at
/// all is malformed.
pub fn decode_line(line: &str) -> Option<StreamFrame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload == DONE_MARKER {
        return Some(StreamFrame::Done);
    }
    let value = match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => value,
        Err(_) => return Some(StreamFrame::malformed(line)),
    };
    let chunk = serde_json::from_value::<ChatCompletionChunk>(value).ok()?;
    chunk.content().map(StreamFrame::delta)
}

struct DecodeState<S> {
    stream: S,
    decoder: FrameDecoder,
    queue: VecDeque<Result<StreamFrame>>,
    ended: bool,
}

/// Turn a response body into a stream of frames.
///
/// The remainder is decoded once the body ends, whether it ended cleanly or with a transport
/// error.  A transport error is yielded after every frame that preceded it and ends the stream.
pub fn decode_frames<S>(byte_stream: S) -> impl Stream<Item = Result<StreamFrame>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let state = DecodeState {
        stream: byte_stream,
        decoder: FrameDecoder::new(),
        queue: VecDeque::new(),
        ended: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some((item, state));
            }
            if state.ended {
                return None;
            }
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    let frames = state.decoder.push(&bytes);
                    state.queue.extend(frames.into_iter().map(Ok));
                }
                Some(Err(e)) => {
                    state.ended = true;
                    state.queue.extend(state.decoder.finish().map(Ok));
                    state.queue.push_back(Err(e));
                }
                None => {
                    state.ended = true;
                    state.queue.extend(state.decoder.finish().map(Ok));
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const HI: &str = r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#;

    fn data(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    fn deltas(frames: &[StreamFrame]) -> Vec<String> {
        frames
            .iter()
            .filter_map(|f| f.text().map(str::to_string))
            .collect()
    }

    fn decode_all(chunks: &[&[u8]]) -> Vec<StreamFrame> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            frames.extend(decoder.push(chunk));
        }
        frames.extend(decoder.finish());
        frames
    }

    #[test]
    fn single_line() {
        let frames = decode_all(&[format!("{HI}\n").as_bytes()]);
        assert_eq!(frames, vec![StreamFrame::delta("hi")]);
    }

    #[test]
    fn line_split_across_chunks() {
        let (head, tail) = HI.split_at(r#"data: {"choices""#.len());
        let tail = format!("{tail}\n");
        let frames = decode_all(&[head.as_bytes(), tail.as_bytes()]);
        assert_eq!(frames, vec![StreamFrame::delta("hi")]);
    }

    #[test]
    fn chunk_boundary_invariance() {
        let body = format!(
            "{}{}: keep-alive\n\n{}data: [DONE]\n\n",
            data("Hel"),
            data("lo, "),
            data("wörld 👋")
        );
        let bytes = body.as_bytes();
        let expected = deltas(&decode_all(&[bytes]));
        assert_eq!(expected, vec!["Hel", "lo, ", "wörld 👋"]);

        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(deltas(&decode_all(&[a, b])), expected, "split at {split}");
        }
        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(deltas(&decode_all(&singles)), expected);
        let triples: Vec<&[u8]> = bytes.chunks(3).collect();
        assert_eq!(deltas(&decode_all(&triples)), expected);
    }

    #[test]
    fn malformed_line_is_skipped_in_order() {
        let body = format!("{}data: {{not json\n{}", data("one"), data("two"));
        let frames = decode_all(&[body.as_bytes()]);
        assert_eq!(
            frames,
            vec![
                StreamFrame::delta("one"),
                StreamFrame::malformed("data: {not json"),
                StreamFrame::delta("two"),
            ]
        );
        assert_eq!(deltas(&frames).concat(), "onetwo");
    }

    #[test]
    fn done_marker() {
        let frames = decode_all(&[b"data: [DONE]\n".as_slice()]);
        assert_eq!(frames, vec![StreamFrame::Done]);
        assert_eq!(decode_line("  data: [DONE]\r"), Some(StreamFrame::Done));
    }

    #[test]
    fn remainder_without_newline_is_decoded_once() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(HI.as_bytes()).is_empty());
        assert_eq!(decoder.remainder(), HI);
        assert_eq!(decoder.finish(), Some(StreamFrame::delta("hi")));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn crlf_and_missing_space() {
        let body = "data:{\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r\n\r\n";
        assert_eq!(
            decode_all(&[body.as_bytes()]),
            vec![StreamFrame::delta("a")]
        );
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let frames = decode_all(&[b"event: message\nid: 7\n: comment\nretry: 10\n\n".as_slice()]);
        assert!(frames.is_empty());
    }

    #[test]
    fn content_free_chunks_yield_nothing() {
        let body = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\
                    data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n";
        assert!(decode_all(&[body.as_bytes()]).is_empty());
    }

    #[test]
    fn unexpected_json_shapes_yield_nothing() {
        for line in [
            r#"data: {"choices":null}"#,
            r#"data: {"choices":"x"}"#,
            r#"data: {"choices":[{"delta":{"content":5}}]}"#,
            r#"data: {"choices":[{"delta":null}]}"#,
            "data: 42",
        ] {
            assert_eq!(decode_line(line), None, "{line}");
        }
        let body = format!("{}data: {{\"choices\":\"x\"}}\n{}", data("one"), data("two"));
        assert_eq!(
            decode_all(&[body.as_bytes()]),
            vec![StreamFrame::delta("one"), StreamFrame::delta("two")]
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut body = b"data: {\"choices\":[{\"delta\":{\"content\":\"a".to_vec();
        body.push(0xff);
        body.extend_from_slice(b"b\"}}]}\n");
        assert_eq!(
            decode_all(&[body.as_slice()]),
            vec![StreamFrame::delta("a\u{fffd}b")]
        );
    }

    #[tokio::test]
    async fn stream_adapter_decodes_frames() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from(&HI.as_bytes()[..10])),
            Ok(Bytes::from(format!("{}\n", &HI[10..]))),
            Ok(Bytes::from_static(b"data: [DONE]\n")),
        ];
        let frames: Vec<_> = decode_frames(stream::iter(chunks)).collect().await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], Ok(StreamFrame::ContentDelta { text }) if text == "hi"));
        assert!(matches!(frames[1], Ok(StreamFrame::Done)));
    }

    #[tokio::test]
    async fn stream_adapter_yields_error_last() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from(data("x"))),
            Ok(Bytes::from_static(HI.as_bytes())),
            Err(Error::stream_interrupted("connection reset", None)),
            Ok(Bytes::from(data("never"))),
        ];
        let frames: Vec<_> = decode_frames(stream::iter(chunks)).collect().await;
        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], Ok(StreamFrame::ContentDelta { text }) if text == "x"));
        assert!(matches!(&frames[1], Ok(StreamFrame::ContentDelta { text }) if text == "hi"));
        assert!(matches!(&frames[2], Err(e) if e.is_stream_interrupted()));
    }

    #[tokio::test]
    async fn stream_adapter_decodes_trailing_remainder() {
        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from_static(HI.as_bytes()))];
        let frames: Vec<_> = decode_frames(stream::iter(chunks)).collect().await;
        assert_eq!(frames.len(), 1);
        assert!(matches!(&frames[0], Ok(StreamFrame::ContentDelta { text }) if text == "hi"));
    }
}
