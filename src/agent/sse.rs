use bytes::{Buf, BytesMut};

use super::types::AgentAnswer;

/// Splits a byte stream into text lines.
///
/// Network chunks can end anywhere, including in the middle of a UTF-8
/// sequence, so bytes are buffered until a full line is available.
#[derive(Debug, Default)]
pub(super) struct SseLineDecoder {
    buffer: BytesMut,
}

impl SseLineDecoder {
    /// Feed bytes in, get back every line they completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Whatever is left once the body has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = self.buffer.split();
        Some(decode_line(&line))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Decode a `data:` line into its answer fragment.
///
/// Returns `None` for any other kind of line.
pub(super) fn parse_data_line(line: &str) -> Option<Result<String, serde_json::Error>> {
    let data = line.strip_prefix("data:")?;
    Some(serde_json::from_str::<AgentAnswer>(data.trim()).map(|a| a.answer))
}
