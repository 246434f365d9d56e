//! Incremental `text/event-stream` parser.

use super::TransportError;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSentEvent {
    /// Event name; `message` when the server sent none.
    pub event: String,
    /// Data lines joined with `\n`.
    pub data: String,
    pub id: Option<String>,
}

impl ServerSentEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
        }
    }
}

/// Longest partial line kept while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Feeds arbitrary byte chunks in, yields complete events out.
///
/// Chunks may split lines (and UTF-8 sequences) anywhere. A partial line
/// longer than the parser's limit fails the feed and resets the buffer.
#[derive(Debug)]
pub struct SseParser {
    pending: Vec<u8>,
    /// Prefix of `pending` already searched for a newline.
    scanned: usize,
    max_line: usize,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::with_capacity(8192),
            scanned: 0,
            max_line,
            event: None,
            data: Vec::new(),
            last_id: None,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<ServerSentEvent>, TransportError> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            let line = String::from_utf8_lossy(strip_cr(&self.pending[start..end])).into_owned();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
            start = end + 1;
            self.scanned = start;
        }

        // Remove processed lines from buffer
        self.pending.drain(..start);
        self.scanned = self.pending.len();

        if self.pending.len() > self.max_line {
            let len = self.pending.len();
            self.pending.clear();
            self.scanned = 0;
            return Err(TransportError::Io(format!(
                "event stream line exceeds {} bytes ({len} buffered)",
                self.max_line
            )));
        }
        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<ServerSentEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerSentEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ServerSentEvent {
            event: event
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "message".to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_event() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: merchant_message\ndata: {\"text\":\"hi\"}\n\n").unwrap();
        assert_eq!(
            events,
            vec![ServerSentEvent::new("merchant_message", "{\"text\":\"hi\"}")]
        );
    }

    #[test]
    fn chunks_split_mid_line() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: conn").unwrap().is_empty());
        assert!(parser.feed(b"ected\r\ndata: {}").unwrap().is_empty());
        let events = parser.feed(b"\r\n\r\n").unwrap();
        assert_eq!(events, vec![ServerSentEvent::new("connected", "{}")]);
    }

    #[test]
    fn multi_line_data_comments_and_ids() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\nid: 7\ndata: line one\ndata:line two\n\n").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "line one\nline two");
        assert_eq!(events[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn blank_line_without_data_dispatches_nothing() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: ping\n\n").unwrap().is_empty());
        let events = parser.feed(b"data: x\n\n").unwrap();
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn several_events_in_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: a\n\ndata: b\n\n").unwrap();
        let data: Vec<_> = events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(data, vec!["a", "b"]);
    }

    #[test]
    fn long_line_across_many_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: ").unwrap().is_empty());
        for _ in 0..1000 {
            assert!(parser.feed(b"xxxxxxxxxx").unwrap().is_empty());
        }
        let events = parser.feed(b"\n\n").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data.len(), 10_000);
    }

    #[test]
    fn overlong_line_is_rejected_and_buffer_reset() {
        let mut parser = SseParser::with_max_line(16);
        assert!(parser.feed(b"data: 0123456789").unwrap().is_empty());
        let err = parser.feed(b"abcdef").unwrap_err();
        assert!(matches!(err, TransportError::Io(_)), "got {err:?}");

        let events = parser.feed(b"\ndata: ok\n\n").unwrap();
        assert_eq!(events, vec![ServerSentEvent::new("message", "ok")]);
    }

    #[test]
    fn complete_lines_do_not_count_against_the_limit() {
        let mut parser = SseParser::with_max_line(16);
        let events = parser
            .feed(b"data: a line well past sixteen bytes\n\ndata: b")
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(parser.feed(b"\n\n").unwrap()[0].data, "b");
    }
}
