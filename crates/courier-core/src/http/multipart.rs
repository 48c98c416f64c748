//! `multipart/form-data` body writer
//!
//! Parts are written straight into an in-memory buffer: a delimiter, the part
//! headers, then whatever the caller copies into [`MultipartWriter::part_body`].
//! [`MultipartWriter::finish`] appends the closing boundary.

use rand::RngCore;

/// Escape `\` and `"` for use inside a quoted `Content-Disposition` parameter
pub fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Streaming-order multipart body builder
#[derive(Debug)]
pub struct MultipartWriter {
    boundary: String,
    buffer: Vec<u8>,
    parts: usize,
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartWriter {
    /// Writer with a random 60 character hex boundary
    pub fn new() -> Self {
        let mut random = [0u8; 30];
        rand::thread_rng().fill_bytes(&mut random);
        let boundary = random.iter().map(|b| format!("{:02x}", b)).collect::<String>();
        Self::with_boundary(&boundary)
    }

    pub fn with_boundary(boundary: &str) -> Self {
        Self {
            boundary: boundary.to_string(),
            buffer: Vec::new(),
            parts: 0,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value for the finished body
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Start a part with the given headers; its body is written through
    /// [`MultipartWriter::part_body`]
    pub fn create_part(&mut self, headers: &[(&str, &str)]) {
        if self.parts == 0 {
            self.buffer.extend_from_slice(b"--");
        } else {
            self.buffer.extend_from_slice(b"\r\n--");
        }
        self.buffer.extend_from_slice(self.boundary.as_bytes());
        self.buffer.extend_from_slice(b"\r\n");

        for (name, value) in headers {
            self.buffer.extend_from_slice(name.as_bytes());
            self.buffer.extend_from_slice(b": ");
            self.buffer.extend_from_slice(value.as_bytes());
            self.buffer.extend_from_slice(b"\r\n");
        }
        self.buffer.extend_from_slice(b"\r\n");
        self.parts += 1;
    }

    /// Start a file part whose disposition and type are inferred from the names
    pub fn create_form_file(&mut self, field_name: &str, file_name: &str) {
        let disposition = format!(
            "form-data; name=\"{}\"; filename=\"{}\"",
            escape_quotes(field_name),
            escape_quotes(file_name)
        );
        self.create_part(&[
            ("Content-Disposition", disposition.as_str()),
            ("Content-Type", "application/octet-stream"),
        ]);
    }

    /// Write a complete plain form field
    pub fn write_field(&mut self, name: &str, value: &str) {
        let disposition = format!("form-data; name=\"{}\"", escape_quotes(name));
        self.create_part(&[("Content-Disposition", disposition.as_str())]);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Sink for the body of the part most recently started
    pub fn part_body(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }

    /// Number of parts written so far
    pub fn part_count(&self) -> usize {
        self.parts
    }

    /// Append the closing boundary and hand back the body
    pub fn finish(mut self) -> Vec<u8> {
        if self.parts > 0 {
            self.buffer.extend_from_slice(b"\r\n");
        }
        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(self.boundary.as_bytes());
        self.buffer.extend_from_slice(b"--\r\n");
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_quotes("plain.txt"), "plain.txt");
        assert_eq!(escape_quotes(r#"say "hi".txt"#), r#"say \"hi\".txt"#);
        assert_eq!(escape_quotes(r"C:\dir\f.txt"), r"C:\\dir\\f.txt");
        assert_eq!(escape_quotes(r#"\""#), r#"\\\""#);
    }

    #[test]
    fn test_single_field() {
        let mut writer = MultipartWriter::with_boundary("boundary");
        writer.write_field("field1", "value1");
        let body = writer.finish();

        let expected = b"--boundary\r\n\
            Content-Disposition: form-data; name=\"field1\"\r\n\r\n\
            value1\r\n\
            --boundary--\r\n";
        assert_eq!(body, expected);
    }

    #[test]
    fn test_file_then_field() {
        let mut writer = MultipartWriter::with_boundary("b");
        writer.create_form_file("file", "a.txt");
        writer.part_body().extend_from_slice(b"content");
        writer.write_field("note", "x");
        assert_eq!(writer.part_count(), 2);

        let body = String::from_utf8(writer.finish()).unwrap();
        assert_eq!(
            body,
            "--b\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             content\r\n\
             --b\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             x\r\n\
             --b--\r\n"
        );
    }

    #[test]
    fn test_empty_writer_still_closes() {
        let body = MultipartWriter::with_boundary("empty").finish();
        assert_eq!(body, b"--empty--\r\n");
    }

    #[test]
    fn test_random_boundary() {
        let first = MultipartWriter::new();
        let second = MultipartWriter::new();
        assert_eq!(first.boundary().len(), 60);
        assert_ne!(first.boundary(), second.boundary());
        assert!(first.content_type().starts_with("multipart/form-data; boundary="));
    }
}
