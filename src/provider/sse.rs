//! Minimal `text/event-stream` decoder for provider run streams.
//!
//! Bytes arrive in arbitrary chunks; frames are separated by a blank line.
//! Only `event:` and `data:` fields are kept, comments and `id:`/`retry:`
//! are dropped.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Append `chunk` and return every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = find_blank_line(&self.buf) {
            let raw: Vec<u8> = self.buf.drain(..end + 2).collect();
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw[..end])) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_frame(text: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseFrame { event, data: data.join("\n") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_chunks() {
        let mut d = SseDecoder::default();
        assert!(d.feed(b"event: thread.message.delta\ndata: {\"a\"").is_empty());
        let frames = d.feed(b":1}\n\nevent: done\ndata: [DONE]\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event.as_deref(), Some("thread.message.delta"));
        assert_eq!(frames[0].data, "{\"a\":1}");
        assert_eq!(frames[1].data, "[DONE]");
    }

    #[test]
    fn crlf_line_endings_accepted() {
        let mut d = SseDecoder::default();
        let frames = d.feed(b"event: thread.run.completed\r\ndata: {}\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("thread.run.completed"));
    }

    #[test]
    fn comments_and_multiline_data() {
        let mut d = SseDecoder::default();
        let frames = d.feed(b": keepalive\n\ndata: one\ndata: two\n\n");
        assert_eq!(frames, vec![SseFrame { event: None, data: "one\ntwo".into() }]);
    }

    #[test]
    fn multibyte_text_split_mid_character() {
        let payload = "data: café\n\n".as_bytes();
        let split = payload.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut d = SseDecoder::default();
        assert!(d.feed(&payload[..split]).is_empty());
        let frames = d.feed(&payload[split..]);
        assert_eq!(frames[0].data, "café");
    }
}
