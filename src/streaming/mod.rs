//! SSE (Server-Sent Events) helpers
//!
//! Inbound: a line buffer and frame parser for the gateway's
//! `chat/completions` event stream. Outbound: formatting of
//! [`StreamEvent`]s as `data:` frames for the caller.

use bytes::Bytes;
use serde::Deserialize;

use crate::dispatch::StreamEvent;

/// Buffer for accumulating incomplete SSE lines across chunk boundaries.
///
/// Network chunks do not align with line boundaries, so partial lines are
/// held until their terminating `\n` arrives.
///
/// # Example
/// ```
/// use tiered_relay::streaming::SseLineBuffer;
///
/// let mut buffer = SseLineBuffer::new();
/// assert!(buffer.feed(b"data: {\"a\":").is_empty());
/// assert_eq!(buffer.feed(b"1}\n"), vec!["data: {\"a\":1}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    incomplete: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self {
            incomplete: Vec::new(),
        }
    }

    /// Feed bytes and return every line completed by them.
    ///
    /// Newlines (and a preceding `\r`) are stripped; blank separator lines
    /// are dropped. Lines are decoded only once complete, so a multi-byte
    /// character split across chunks survives. Invalid UTF-8 is replaced
    /// rather than rejected.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.incomplete.extend_from_slice(bytes);

        let mut complete_lines = Vec::new();
        while let Some(newline_pos) = self.incomplete.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.incomplete.drain(..=newline_pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                complete_lines.push(String::from_utf8_lossy(&line).into_owned());
            }
        }

        complete_lines
    }

    /// Whether a partial line is still waiting for its newline
    pub fn has_incomplete(&self) -> bool {
        !self.incomplete.is_empty()
    }

    /// Decoded partial line, for flushing once the body ends
    pub fn remaining(&self) -> String {
        let line = self.incomplete.strip_suffix(b"\r").unwrap_or(&self.incomplete[..]);
        String::from_utf8_lossy(line).into_owned()
    }
}

/// Meaning of one upstream SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Reply text (may be empty for role-only or finish deltas)
    Content(String),
    /// `data: [DONE]`
    Done,
    /// The gateway reported an error inside the stream
    Error(String),
    /// Comments, `event:`/`id:` fields, unparsable data
    Skip,
}

#[derive(Debug, Deserialize)]
struct UpstreamChunk {
    #[serde(default)]
    choices: Vec<UpstreamChoice>,
    #[serde(default)]
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct UpstreamChoice {
    #[serde(default)]
    delta: UpstreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct UpstreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    #[serde(default)]
    message: String,
}

/// Classify one complete line of the gateway's event stream
pub fn parse_sse_line(line: &str) -> SseFrame {
    let Some(data) = line.strip_prefix("data:") else {
        return SseFrame::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseFrame::Done;
    }

    match serde_json::from_str::<UpstreamChunk>(data) {
        Ok(UpstreamChunk {
            error: Some(err), ..
        }) => SseFrame::Error(err.message),
        Ok(chunk) => SseFrame::Content(
            chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .unwrap_or_default(),
        ),
        Err(_) => SseFrame::Skip,
    }
}

/// Format a dispatch event as an SSE `data:` frame
pub fn format_event(event: &StreamEvent) -> Bytes {
    match serde_json::to_string(event) {
        Ok(json) => Bytes::from(format!("data: {}\n\n", json)),
        // Plain enum of strings; serialization cannot fail in practice.
        Err(_) => Bytes::from_static(b"data: {\"type\":\"failed\"}\n\n"),
    }
}
