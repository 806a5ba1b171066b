//! Server-sent event decoding for streamed chat completions.
//!
//! The completion endpoint answers with a chunked body of lines. Lines of
//! interest look like `data: {"choices":[{"delta":{"content":"Hi"}}]}`;
//! everything else (blank keep-alives, `: comment` lines, `event:` lines,
//! the `data: [DONE]` sentinel) is ignored. A frame whose JSON does not
//! parse is skipped, never fatal.
//!
//! Three layers, from pure to async:
//!
//! - [`LineBuffer`] splits raw byte chunks into lines, holding partial
//!   lines (and split UTF-8 sequences) until their newline arrives
//! - [`SseDecoder`] turns lines into content fragments
//! - [`decode_stream`] adapts a byte stream into a lazy
//!   [`FragmentStream`]; [`ReplyStream`] accumulates the full reply

use std::collections::VecDeque;
use std::fmt::Display;

use futures::{Stream, StreamExt};
use personachat_core::error::ProviderError;
use personachat_core::provider::FragmentStream;
use serde::Deserialize;
use tracing::trace;

/// Prefix of every event line that carries a payload.
pub const DATA_PREFIX: &str = "data: ";

/// Extract the content fragment carried by one event line.
///
/// Returns `None` for lines without the `data: ` prefix, for payloads that
/// are not valid JSON, and for events without `choices[0].delta.content`
/// (or with an empty one).
pub fn decode_line(line: &str) -> Option<String> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => event
            .choices
            .into_iter()
            .next()?
            .delta
            .content
            .filter(|c| !c.is_empty()),
        Err(e) => {
            trace!(data = %payload, error = %e, "Ignoring unparseable SSE frame");
            None
        }
    }
}

// ── Line buffering ────────────────────────────────────────────────────────

/// Splits arbitrary byte chunks into complete lines.
///
/// Bytes are buffered until `\n`; the trailing `\r` of CRLF endings is
/// dropped. Decoding to UTF-8 happens per complete line, so a multi-byte
/// character split across two chunks decodes intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let rest = self.pending.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.pending, rest);
            line.pop();
            lines.push(Self::decode(line));
        }
        lines
    }

    /// Flush a final line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        Some(Self::decode(line))
    }

    fn decode(mut line: Vec<u8>) -> String {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}

// ── Decoder ───────────────────────────────────────────────────────────────

/// Incremental decoder from raw body bytes to content fragments.
#[derive(Debug, Default)]
pub struct SseDecoder {
    lines: LineBuffer,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk; returns the fragments of every completed line,
    /// in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.lines
            .push(bytes)
            .iter()
            .filter_map(|line| decode_line(line))
            .collect()
    }

    /// Signal end of body; decodes any unterminated final line.
    pub fn finish(&mut self) -> Vec<String> {
        self.lines
            .finish()
            .and_then(|line| decode_line(&line))
            .into_iter()
            .collect()
    }
}

/// Adapt a byte-chunk stream into a lazy stream of content fragments.
///
/// Nothing is read from `bytes` until the returned stream is polled, and
/// each poll reads only as many chunks as it takes to produce the next
/// fragment. Fragments already decoded when the transport fails are still
/// delivered, followed by a single `StreamInterrupted` error.
pub fn decode_stream<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        failure: None,
        exhausted: false,
    };

    Box::pin(futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(fragment) = st.ready.pop_front() {
                return Some((Ok(fragment), st));
            }
            if let Some(err) = st.failure.take() {
                return Some((Err(err), st));
            }
            if st.exhausted {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let fragments = st.decoder.feed(chunk.as_ref());
                    st.ready.extend(fragments);
                }
                Some(Err(e)) => {
                    st.exhausted = true;
                    st.failure = Some(ProviderError::StreamInterrupted(e.to_string()));
                }
                None => {
                    st.exhausted = true;
                    let fragments = st.decoder.finish();
                    st.ready.extend(fragments);
                }
            }
        }
    }))
}

struct DecodeState<S> {
    bytes: std::pin::Pin<Box<S>>,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    failure: Option<ProviderError>,
    exhausted: bool,
}

// ── Reply accumulation ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyState {
    Streaming,
    Completed,
    Failed,
}

/// A reply being streamed: forwards fragments and keeps the running text.
///
/// The full text is only released by [`ReplyStream::into_reply`] once the
/// stream reached its natural end. A reply abandoned midway, or cut off
/// by a transport error, yields `None` there.
pub struct ReplyStream {
    fragments: FragmentStream,
    text: String,
    state: ReplyState,
}

impl ReplyStream {
    pub fn new(fragments: FragmentStream) -> Self {
        Self {
            fragments,
            text: String::new(),
            state: ReplyState::Streaming,
        }
    }

    /// Pull the next fragment.
    ///
    /// Returns `None` once the stream ended or failed; a failure is
    /// reported exactly once as `Some(Err(_))`.
    pub async fn next_fragment(&mut self) -> Option<Result<String, ProviderError>> {
        if self.state != ReplyState::Streaming {
            return None;
        }
        match self.fragments.next().await {
            Some(Ok(fragment)) => {
                self.text.push_str(&fragment);
                Some(Ok(fragment))
            }
            Some(Err(e)) => {
                self.state = ReplyState::Failed;
                Some(Err(e))
            }
            None => {
                self.state = ReplyState::Completed;
                None
            }
        }
    }

    /// Text received so far.
    pub fn partial(&self) -> &str {
        &self.text
    }

    /// Whether the stream reached its end without a transport error.
    pub fn is_complete(&self) -> bool {
        self.state == ReplyState::Completed
    }

    /// Whether the stream was cut off by a transport error.
    pub fn is_failed(&self) -> bool {
        self.state == ReplyState::Failed
    }

    /// The full reply, only if the stream completed.
    pub fn into_reply(self) -> Option<String> {
        self.is_complete().then_some(self.text)
    }

    /// Drain every remaining fragment and return the full reply.
    pub async fn collect(mut self) -> Result<String, ProviderError> {
        while let Some(item) = self.next_fragment().await {
            item?;
        }
        Ok(self.text)
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

/// A single `data: {...}` event from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, std::io::Error>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    async fn drain(mut stream: FragmentStream) -> Vec<Result<String, ProviderError>> {
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item);
        }
        out
    }

    // --- decode_line ---

    #[test]
    fn content_delta_is_extracted() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(decode_line(line).as_deref(), Some("Hello"));
    }

    #[test]
    fn done_sentinel_is_ignored() {
        assert!(decode_line("data: [DONE]").is_none());
    }

    #[test]
    fn lines_without_prefix_are_ignored() {
        assert!(decode_line("").is_none());
        assert!(decode_line(": OPENROUTER PROCESSING").is_none());
        assert!(decode_line("event: message").is_none());
        assert!(decode_line(r#"{"choices":[{"delta":{"content":"x"}}]}"#).is_none());
        assert!(decode_line(r#"data:{"choices":[{"delta":{"content":"x"}}]}"#).is_none());
    }

    #[test]
    fn malformed_json_is_ignored() {
        assert!(decode_line(r#"data: {"choices":[{"delta":{"content":"Hel"#).is_none());
    }

    #[test]
    fn finish_chunk_without_content_is_ignored() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert!(decode_line(line).is_none());
    }

    #[test]
    fn empty_choices_and_usage_chunk_are_ignored() {
        let line = r#"data: {"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        assert!(decode_line(line).is_none());
    }

    #[test]
    fn empty_content_is_not_a_fragment() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant","content":""}}]}"#;
        assert!(decode_line(line).is_none());
    }

    #[test]
    fn only_first_choice_is_read() {
        let line = r#"data: {"choices":[{"delta":{"content":"a"}},{"delta":{"content":"b"}}]}"#;
        assert_eq!(decode_line(line).as_deref(), Some("a"));
    }

    // --- LineBuffer ---

    #[test]
    fn line_buffer_holds_partial_lines() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        assert_eq!(buf.push(b":1}\r\nnext"), vec!["data: {\"a\":1}".to_string()]);
        assert_eq!(buf.finish().as_deref(), Some("next"));
        assert!(buf.finish().is_none());
    }

    #[test]
    fn line_buffer_rejoins_split_utf8() {
        let bytes = "héllo\n".as_bytes();
        // Split inside the two-byte 'é'.
        let mut buf = LineBuffer::new();
        assert!(buf.push(&bytes[..2]).is_empty());
        assert_eq!(buf.push(&bytes[2..]), vec!["héllo".to_string()]);
    }

    // --- SseDecoder ---

    #[test]
    fn decoder_skips_noise_between_frames() {
        let mut dec = SseDecoder::new();
        let body = concat!(
            ": keep-alive\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n",
            "data: {broken\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" two\"}}]}\n",
            "data: [DONE]\n",
        );
        assert_eq!(dec.feed(body.as_bytes()), vec!["one", " two"]);
        assert!(dec.finish().is_empty());
    }

    #[test]
    fn decoder_flushes_unterminated_last_line() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(br#"data: {"choices":[{"delta":{"content":"tail"}}]}"#).is_empty());
        assert_eq!(dec.finish(), vec!["tail"]);
    }

    // --- decode_stream / ReplyStream ---

    #[tokio::test]
    async fn hi_there_round_trip() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n",
            "data: [DONE]\n",
        ]);
        let mut reply = ReplyStream::new(decode_stream(futures::stream::iter(body)));

        let mut seen = Vec::new();
        while let Some(fragment) = reply.next_fragment().await {
            seen.push(fragment.unwrap());
        }
        assert_eq!(seen, vec!["Hi", " there"]);
        assert!(reply.is_complete());
        assert_eq!(reply.into_reply().as_deref(), Some("Hi there"));
    }

    #[tokio::test]
    async fn body_is_read_only_as_fragments_are_pulled() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let pulls = Arc::new(AtomicUsize::new(0));
        let counter = pulls.clone();
        let body = futures::stream::iter(chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"three\"}}]}\n",
        ]))
        .inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut fragments = decode_stream(body);
        assert_eq!(pulls.load(Ordering::SeqCst), 0);

        for (n, expected) in ["one", "two", "three"].into_iter().enumerate() {
            assert_eq!(fragments.next().await.unwrap().unwrap(), expected);
            assert_eq!(pulls.load(Ordering::SeqCst), n + 1);
        }

        assert!(fragments.next().await.is_none());
        assert_eq!(pulls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn frames_split_across_chunks() {
        let body = chunks(&[
            "data: {\"choices\":[{\"del",
            "ta\":{\"content\":\"A\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}",
            "\n\n",
        ]);
        let got: Vec<String> = drain(decode_stream(futures::stream::iter(body)))
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(got, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn transport_error_ends_stream_after_decoded_fragments() {
        let body: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n".to_vec()),
        ];
        let items = drain(decode_stream(futures::stream::iter(body))).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(items[1], Err(ProviderError::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn failed_reply_is_not_released() {
        let body: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"half\"}}]}\n".to_vec()),
            Err(std::io::Error::other("boom")),
        ];
        let mut reply = ReplyStream::new(decode_stream(futures::stream::iter(body)));
        assert_eq!(reply.next_fragment().await.unwrap().unwrap(), "half");
        assert!(reply.next_fragment().await.unwrap().is_err());
        assert!(reply.next_fragment().await.is_none());
        assert!(reply.is_failed());
        assert_eq!(reply.partial(), "half");
        assert!(reply.into_reply().is_none());
    }

    #[tokio::test]
    async fn abandoned_reply_is_not_released() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        ]);
        let mut reply = ReplyStream::new(decode_stream(futures::stream::iter(body)));
        assert_eq!(reply.next_fragment().await.unwrap().unwrap(), "a");
        assert!(!reply.is_complete());
        assert!(reply.into_reply().is_none());
    }

    #[tokio::test]
    async fn collect_drains_full_reply() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
            "data: nonsense\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"y\"}}]}\n",
        ]);
        let reply = ReplyStream::new(decode_stream(futures::stream::iter(body)));
        assert_eq!(reply.collect().await.unwrap(), "xy");
    }

    #[tokio::test]
    async fn empty_body_yields_empty_completed_reply() {
        let body: Vec<Result<Vec<u8>, std::io::Error>> = Vec::new();
        let mut reply = ReplyStream::new(decode_stream(futures::stream::iter(body)));
        assert!(reply.next_fragment().await.is_none());
        assert_eq!(reply.into_reply().as_deref(), Some(""));
    }
}
