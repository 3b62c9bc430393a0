//! Incremental decoder for `text/event-stream` bodies.
//!
//! Network chunks do not respect line or UTF-8 boundaries, so bytes are
//! buffered until a full line is available. Only `data:` fields matter for
//! the generation API; other fields and comments are ignored.

/// Buffers raw bytes and yields the `data` payload of each complete event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the payloads of events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest);
            let line = rest.trim_end_matches(['\n', '\r']).to_string();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_decoder_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"a\":1}\r\n\r\n");
        assert_eq!(events, vec![r#"{"a":1}"#.to_string()]);
    }

    #[test]
    fn test_sse_decoder_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"te").is_empty());
        assert!(decoder.push(b"xt\":\"hi\"}\n").is_empty());
        let events = decoder.push(b"\ndata: next\n\n");
        assert_eq!(events, vec![r#"{"text":"hi"}"#.to_string(), "next".to_string()]);
    }

    #[test]
    fn test_sse_decoder_utf8_split_across_chunks() {
        let bytes = "data: Équilibre\n\n".as_bytes();
        let mut decoder = SseDecoder::new();
        // Split inside the two-byte 'É'.
        assert!(decoder.push(&bytes[..7]).is_empty());
        assert_eq!(decoder.push(&bytes[7..]), vec!["Équilibre".to_string()]);
    }

    #[test]
    fn test_sse_decoder_joins_multiline_data_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\nevent: message\ndata: a\ndata: b\n\n");
        assert_eq!(events, vec!["a\nb".to_string()]);
    }

    #[test]
    fn test_sse_decoder_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
        assert_eq!(decoder.finish(), None);
    }
}
