// libs/assistant-cell/src/services/stream.rs
//
// Reassembles the text of a chat completion from a chunked `data: <json>`
// event stream. Chunks arrive as raw bytes and can split anywhere: in the
// middle of a UTF-8 sequence, a line, or a JSON frame. The aggregator is
// chunk-boundary independent: feeding a stream byte by byte produces the
// same text as feeding it whole.
use serde_json::Value;
use tracing::{debug, trace};

enum LineOutcome {
    Consumed,
    Done,
    Rebuffer,
}

#[derive(Debug, Default)]
pub struct StreamAggregator {
    /// Undecoded tail of the last chunk: a multi-byte UTF-8 sequence that
    /// straddles the chunk boundary.
    pending_bytes: Vec<u8>,
    /// Decoded text up to, but not including, a line terminator.
    line_buffer: String,
    /// The accumulated completion text.
    text: String,
    done: bool,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received chunk. Chunks arriving after the `[DONE]` sentinel
    /// are ignored.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.done {
            return;
        }
        self.decode(chunk);
        self.drain_lines();
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Finish on transport completion and yield the accumulated text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// Decode a chunk into the line buffer, carrying an incomplete trailing
    /// UTF-8 sequence over to the next chunk.
    fn decode(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    self.line_buffer.push_str(valid);
                    break;
                }
                Err(error) => {
                    let (valid, rest) = input.split_at(error.valid_up_to());
                    self.line_buffer
                        .push_str(std::str::from_utf8(valid).unwrap_or(""));

                    match error.error_len() {
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.pending_bytes = rest.to_vec();
                            break;
                        }
                        // Genuinely invalid bytes: replace and move on
                        Some(len) => {
                            self.line_buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                    }
                }
            }
        }
    }

    /// Extract and process every complete line, keeping the trailing
    /// incomplete segment buffered.
    fn drain_lines(&mut self) {
        while let Some(newline) = self.line_buffer.find('\n') {
            let mut line: String = self.line_buffer.drain(..=newline).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }

            match self.process_line(&line) {
                LineOutcome::Consumed => {}
                LineOutcome::Done => {
                    debug!("Stream finished with {} chars of text", self.text.len());
                    self.done = true;
                    self.line_buffer.clear();
                    self.pending_bytes.clear();
                    return;
                }
                LineOutcome::Rebuffer => {
                    // The frame was split by a newline the server emitted
                    // inside the payload. Rejoin the line with what follows
                    // (dropping that newline) and wait for the rest.
                    trace!("Re-buffering split frame of {} chars", line.len());
                    let rest = std::mem::take(&mut self.line_buffer);
                    self.line_buffer = line;
                    self.line_buffer.push_str(&rest);
                    return;
                }
            }
        }
    }

    fn process_line(&mut self, line: &str) -> LineOutcome {
        // SSE comments and keep-alive blanks
        if line.starts_with(':') || line.trim().is_empty() {
            return LineOutcome::Consumed;
        }
        let Some(payload) = line.strip_prefix("data: ") else {
            return LineOutcome::Consumed;
        };

        let payload = payload.trim();
        if payload == "[DONE]" {
            return LineOutcome::Done;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(frame) => {
                if let Some(delta) = frame
                    .pointer("/choices/0/delta/content")
                    .and_then(Value::as_str)
                {
                    self.text.push_str(delta);
                }
                LineOutcome::Consumed
            }
            // Incomplete frame: keep it instead of dropping content
            Err(_) => LineOutcome::Rebuffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{}\"}}}}]}}\n",
            content
        )
    }

    fn aggregate(chunks: &[&[u8]]) -> StreamAggregator {
        let mut aggregator = StreamAggregator::new();
        for chunk in chunks {
            aggregator.push(chunk);
        }
        aggregator
    }

    #[test]
    fn test_single_chunk_stream() {
        let stream = format!("{}{}data: [DONE]\n", delta_line("Bonjour"), delta_line(" !"));
        let aggregator = aggregate(&[stream.as_bytes()]);

        assert!(aggregator.is_done());
        assert_eq!(aggregator.text(), "Bonjour !");
    }

    #[test]
    fn test_byte_by_byte_equals_single_chunk() {
        let stream = format!(
            "{}{}{}data: [DONE]\n",
            delta_line("Voici "),
            delta_line("nos "),
            delta_line("tarifs")
        );

        let whole = aggregate(&[stream.as_bytes()]);

        let mut dribbled = StreamAggregator::new();
        for byte in stream.as_bytes() {
            dribbled.push(std::slice::from_ref(byte));
        }

        assert_eq!(whole.text(), dribbled.text());
        assert_eq!(whole.is_done(), dribbled.is_done());
    }

    #[test]
    fn test_multibyte_utf8_split_across_chunks() {
        let line = delta_line("réservé à l'équipe");
        let bytes = line.as_bytes();
        // Split inside the first 'é' (two-byte sequence)
        let split = line.find('é').unwrap() + 1;

        let aggregator = aggregate(&[&bytes[..split], &bytes[split..]]);
        assert_eq!(aggregator.text(), "réservé à l'équipe");
    }

    #[test]
    fn test_frame_split_across_chunks_without_newline() {
        let aggregator = aggregate(&[
            b"data: {\"choi",
            b"ces\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
        ]);
        assert_eq!(aggregator.text(), "Hi");
    }

    #[test]
    fn test_frame_split_by_interleaved_newline_recovers() {
        // The server emitted a newline inside the frame; the first chunk
        // therefore ends in a complete-looking but unparseable line
        let aggregator = aggregate(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\n",
            b" there\"}}]}\n",
        ]);
        assert_eq!(aggregator.text(), "Hi there");
    }

    #[test]
    fn test_done_sentinel_stops_consumption() {
        let mut aggregator = StreamAggregator::new();
        aggregator.push(delta_line("kept").as_bytes());
        aggregator.push(b"data: [DONE]\n");
        aggregator.push(delta_line("dropped").as_bytes());

        assert!(aggregator.is_done());
        assert_eq!(aggregator.into_text(), "kept");
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let aggregator = aggregate(&[
            b": keepalive\n",
            b"\n",
            b"\r\n",
            delta_line("ok").as_bytes(),
        ]);
        assert_eq!(aggregator.text(), "ok");
    }

    #[test]
    fn test_crlf_line_endings() {
        let aggregator = aggregate(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r\n",
            b"data: [DONE]\r\n",
        ]);
        assert!(aggregator.is_done());
        assert_eq!(aggregator.text(), "a");
    }

    #[test]
    fn test_frames_without_content_are_skipped() {
        let aggregator = aggregate(&[
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            b"data: {\"choices\":[{\"finish_reason\":\"stop\",\"delta\":{}}]}\n",
            delta_line("x").as_bytes(),
        ]);
        assert_eq!(aggregator.text(), "x");
    }

    #[test]
    fn test_trailing_partial_line_is_not_lost_on_transport_end() {
        // Transport can end without [DONE]; an incomplete trailing line is
        // simply never processed
        let mut aggregator = StreamAggregator::new();
        aggregator.push(delta_line("full").as_bytes());
        aggregator.push(b"data: {\"choices\"");

        assert!(!aggregator.is_done());
        assert_eq!(aggregator.into_text(), "full");
    }

    #[test]
    fn test_invalid_utf8_replaced_not_fatal() {
        let mut aggregator = StreamAggregator::new();
        aggregator.push(b"\xff\xfe\n");
        aggregator.push(delta_line("still alive").as_bytes());

        assert_eq!(aggregator.text(), "still alive");
    }

    #[test]
    fn test_empty_chunks_are_harmless() {
        let aggregator = aggregate(&[b"", delta_line("a").as_bytes(), b""]);
        assert_eq!(aggregator.text(), "a");
    }
}
