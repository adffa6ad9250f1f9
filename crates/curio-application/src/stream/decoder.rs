//! Line-oriented decoder for `text/event-stream` style bodies.
//!
//! Chunks carry no alignment guarantee: a chunk may end in the middle of a
//! line or in the middle of a multi-byte character. Bytes are buffered until a
//! newline arrives, and only complete lines are interpreted.

/// Prefix of a content line.
pub const DATA_PREFIX: &str = "data:";
/// Prefix of a control line, never content.
pub const EVENT_PREFIX: &str = "event:";
/// Prefix of a keep-alive comment line, never content.
pub const COMMENT_PREFIX: &str = ":";
/// End-of-stream marker, never content.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for one logical assistant message.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    raw_buffer: Vec<u8>,
    committed: String,
    lines: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the content it completed, in line order.
    ///
    /// The trailing incomplete line stays buffered for the next chunk.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.raw_buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.raw_buffer.iter().rposition(|byte| *byte == b'\n') else {
            return String::new();
        };

        let complete: Vec<u8> = self.raw_buffer.drain(..=last_newline).collect();
        let mut delta = String::new();
        for line in complete.split(|byte| *byte == b'\n') {
            self.decode_line(line, &mut delta);
        }
        self.committed.push_str(&delta);
        delta
    }

    /// Flushes the buffered partial line and returns the content it held.
    ///
    /// Called once the stream has ended, normally or not.
    pub fn flush(&mut self) -> String {
        let remaining = std::mem::take(&mut self.raw_buffer);
        let mut delta = String::new();
        self.decode_line(&remaining, &mut delta);
        self.committed.push_str(&delta);
        delta
    }

    /// All content decoded so far.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_bytes(&self) -> usize {
        self.raw_buffer.len()
    }

    /// Number of complete lines interpreted so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Final message text: committed content with surrounding whitespace
    /// trimmed, or `None` when nothing but whitespace arrived.
    pub fn message_text(&self) -> Option<String> {
        let trimmed = self.committed.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn decode_line(&mut self, raw: &[u8], delta: &mut String) {
        let line = String::from_utf8_lossy(raw);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.is_empty() {
            return;
        }
        self.lines += 1;
        if let Some(content) = classify(line) {
            delta.push_str(content);
        }
    }
}

/// Returns the content carried by a complete, non-empty line.
fn classify(line: &str) -> Option<&str> {
    if line.starts_with(EVENT_PREFIX) || line.starts_with(COMMENT_PREFIX) {
        return None;
    }
    let content = match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    };
    if content.trim() == DONE_SENTINEL {
        return None;
    }
    Some(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> StreamDecoder {
        let mut decoder = StreamDecoder::new();
        for chunk in chunks {
            decoder.push(chunk);
        }
        decoder.flush();
        decoder
    }

    #[test]
    fn test_data_lines_are_concatenated() {
        let decoder = decode_all(&[b"data: Hello\ndata:  world\n\n"]);
        assert_eq!(decoder.committed(), "Hello world");
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.push(b"data: Hel"), "");
        assert_eq!(decoder.pending_bytes(), 9);
        assert_eq!(decoder.push(b"lo\ndata: x"), "Hello");
        assert_eq!(decoder.flush(), "x");
        assert_eq!(decoder.committed(), "Hellox");
    }

    #[test]
    fn test_control_lines_and_sentinel_are_skipped() {
        let decoder = decode_all(&[b"event: message\ndata: hi\ndata: [DONE]\n[DONE]"]);
        assert_eq!(decoder.committed(), "hi");
        assert_eq!(decoder.lines(), 4);
    }

    #[test]
    fn test_keep_alive_comments_are_skipped() {
        let decoder = decode_all(&[b"data: slow
: ping - 2024-10-20 10:00:15
", b"data:  reply
"]);
        assert_eq!(decoder.committed(), "slow reply");
    }

    #[test]
    fn test_unprefixed_lines_are_content() {
        let decoder = decode_all(&[b"plain text\r\n", b"more"]);
        assert_eq!(decoder.committed(), "plain textmore");
    }

    #[test]
    fn test_split_multibyte_character() {
        let text = "data: 你好\n".as_bytes();
        let (head, tail) = text.split_at(8);
        let decoder = decode_all(&[head, tail]);
        assert_eq!(decoder.committed(), "你好");
    }

    #[test]
    fn test_message_text_is_trimmed() {
        let decoder = decode_all(&[b"data:   \n", b"data:  answer \n"]);
        assert_eq!(decoder.message_text().as_deref(), Some("answer"));

        let empty = decode_all(&[b"data:   \n\n"]);
        assert_eq!(empty.message_text(), None);
    }
}
