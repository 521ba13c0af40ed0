use bytes::Bytes;

/// Terminal record closing every chat completion stream.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Sentinel payload carried by the terminal record.
pub const DONE_PAYLOAD: &str = "[DONE]";

/// Frame one payload as a single SSE record: `data: <payload>\n\n`.
/// One chunk per record; records are never coalesced.
pub fn data_frame(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

/// Incremental parser for `data:` records, fed from arbitrary byte chunks.
///
/// Comment lines and unknown fields are skipped; multi-line `data:` payloads
/// within one record are joined with newlines per the SSE spec.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, chunk: &Bytes) -> Vec<String> {
        match std::str::from_utf8(chunk) {
            Ok(text) => self.push_str(text),
            Err(_) => Vec::new(),
        }
    }

    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut records = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let mut line = self.buffer[..pos].to_string();
            self.buffer.drain(..=pos);

            if line.ends_with('\r') {
                line.pop();
            }

            if line.is_empty() {
                self.finish_record(&mut records);
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            if let Some(value) = line.strip_prefix("data:") {
                self.data_lines.push(value.trim_start().to_string());
            } else if line == "data" {
                self.data_lines.push(String::new());
            }
        }

        records
    }

    /// Flush any record left open by a stream that ended without a blank line.
    pub fn finish(&mut self) -> Vec<String> {
        let mut records = Vec::new();
        if !self.buffer.is_empty() {
            let mut line = std::mem::take(&mut self.buffer);
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(value) = line.strip_prefix("data:") {
                self.data_lines.push(value.trim_start().to_string());
            }
        }
        self.finish_record(&mut records);
        records
    }

    fn finish_record(&mut self, records: &mut Vec<String>) {
        if self.data_lines.is_empty() {
            return;
        }
        records.push(self.data_lines.join("\n"));
        self.data_lines.clear();
    }
}
