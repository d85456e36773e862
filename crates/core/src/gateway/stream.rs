//! Decoder for the provider's streamed chat-completion body.
//!
//! The body is a sequence of `data: {json}` lines terminated by
//! `data: [DONE]`. Each JSON chunk carries one content fragment at
//! `choices[0].delta.content`.

use serde::Deserialize;

use crate::error::{ErrorKind, GatewayError};

/// One decoded line of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Token(String),
    Done,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Incremental line decoder; bytes may arrive split at any boundary.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and collect every item completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<StreamItem>, GatewayError> {
        self.buffer.extend_from_slice(bytes);
        let mut items = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(item) = decode_line(&line)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Decode whatever is left once the body has ended.
    pub fn finish(&mut self) -> Result<Option<StreamItem>, GatewayError> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
    }
}

/// Decode a single line. Blank lines, comments and empty deltas yield `None`.
pub fn decode_line(line: &str) -> Result<Option<StreamItem>, GatewayError> {
    let line = line.trim();
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(Some(StreamItem::Done));
    }
    if payload.is_empty() {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(payload).map_err(|e| {
        GatewayError::new(ErrorKind::Decode, format!("Invalid stream chunk: {e}"))
    })?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(StreamItem::Token))
}
