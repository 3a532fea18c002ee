//! multipart/form-data encoding.

use crate::record::Record;
use serde_json::{Value, json};

/// One form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Plain text value.
    Text(String),
    /// Repeated under `key[]`, one part per item.
    List(Vec<String>),
    /// File upload.
    File {
        filename: String,
        content: Vec<u8>,
        mime: String,
    },
}

/// Ordered multipart form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    parts: Vec<(String, Part)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form from a record. Nulls are skipped, arrays become list
    /// parts, booleans are lowercase and objects are JSON-encoded.
    pub fn from_record(record: &Record) -> Self {
        let mut form = Self::new();
        for (key, value) in record {
            form.push_value(key, value);
        }
        form
    }

    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((key.into(), Part::Text(value.into())));
        self
    }

    pub fn list(mut self, key: impl Into<String>, items: Vec<String>) -> Self {
        self.parts.push((key.into(), Part::List(items)));
        self
    }

    pub fn file(
        mut self,
        key: impl Into<String>,
        filename: impl Into<String>,
        content: Vec<u8>,
        mime: impl Into<String>,
    ) -> Self {
        self.parts.push((
            key.into(),
            Part::File {
                filename: filename.into(),
                content,
                mime: mime.into(),
            },
        ));
        self
    }

    /// Append a JSON value with the same conversion as [`Form::from_record`].
    pub fn push_value(&mut self, key: &str, value: &Value) {
        let part = match value {
            Value::Null => return,
            Value::Array(items) => Part::List(items.iter().map(text_of).collect()),
            other => Part::Text(text_of(other)),
        };
        self.parts.push((key.to_string(), part));
    }

    pub fn get(&self, key: &str) -> Option<&Part> {
        self.parts.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    pub fn parts(&self) -> &[(String, Part)] {
        &self.parts
    }

    /// Encode with a random v4 UUID boundary.
    ///
    /// Returns the body and the matching `Content-Type` header value.
    pub fn encode(&self) -> (Vec<u8>, String) {
        let boundary = uuid::Uuid::new_v4().to_string();
        let body = self.encode_with_boundary(&boundary);
        (body, format!("multipart/form-data; boundary={boundary}"))
    }

    /// Encode with a fixed boundary. Line endings are CRLF.
    pub fn encode_with_boundary(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for (key, part) in &self.parts {
            match part {
                Part::Text(value) => {
                    push_header(&mut body, boundary, key);
                    body.extend_from_slice(value.as_bytes());
                    body.extend_from_slice(b"\r\n");
                }
                Part::List(items) => {
                    let list_key = format!("{key}[]");
                    for item in items {
                        push_header(&mut body, boundary, &list_key);
                        body.extend_from_slice(item.as_bytes());
                        body.extend_from_slice(b"\r\n");
                    }
                }
                Part::File {
                    filename,
                    content,
                    mime,
                } => {
                    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{key}\"; filename=\"{filename}\"\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
                    body.extend_from_slice(content);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    /// JSON view of the form; file contents are summarized, not embedded.
    pub fn to_value(&self) -> Value {
        let mut map = Record::new();
        for (key, part) in &self.parts {
            let value = match part {
                Part::Text(text) => json!(text),
                Part::List(items) => json!(items),
                Part::File {
                    filename,
                    content,
                    mime,
                } => json!({"filename": filename, "size": content.len(), "mime": mime}),
            };
            map.insert(key.clone(), value);
        }
        Value::Object(map)
    }
}

fn push_header(body: &mut Vec<u8>, boundary: &str, key: &str) {
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{key}\"\r\n\r\n").as_bytes(),
    );
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_list_and_file_parts() {
        let form = Form::new()
            .text("Name", "web")
            .list("tags", vec!["1".into(), "2".into()])
            .file("file", "file", b"services: {}".to_vec(), "application/x-yaml");

        let body = String::from_utf8(form.encode_with_boundary("B")).unwrap();

        assert_eq!(
            body,
            "--B\r\nContent-Disposition: form-data; name=\"Name\"\r\n\r\nweb\r\n\
             --B\r\nContent-Disposition: form-data; name=\"tags[]\"\r\n\r\n1\r\n\
             --B\r\nContent-Disposition: form-data; name=\"tags[]\"\r\n\r\n2\r\n\
             --B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"file\"\r\n\
             Content-Type: application/x-yaml\r\n\r\nservices: {}\r\n\
             --B--\r\n"
        );
    }

    #[test]
    fn test_from_record_conversions() {
        let record = json!({
            "TLS": false,
            "GroupID": 2,
            "TagIds": "[1, 2]",
            "Skipped": null,
            "Files": ["a.yml"]
        });
        let form = Form::from_record(record.as_object().unwrap());

        assert_eq!(form.get("TLS"), Some(&Part::Text("false".into())));
        assert_eq!(form.get("GroupID"), Some(&Part::Text("2".into())));
        assert_eq!(form.get("TagIds"), Some(&Part::Text("[1, 2]".into())));
        assert_eq!(form.get("Files"), Some(&Part::List(vec!["a.yml".into()])));
        assert!(form.get("Skipped").is_none());
    }

    #[test]
    fn test_encode_uses_uuid_boundary() {
        let (body, content_type) = Form::new().text("a", "b").encode();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();

        assert_eq!(boundary.len(), 36);
        assert!(String::from_utf8(body).unwrap().ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_to_value_summarizes_files() {
        let form = Form::new().file("file", "file", vec![1, 2, 3], "application/x-yaml");
        assert_eq!(
            form.to_value(),
            json!({"file": {"filename": "file", "size": 3, "mime": "application/x-yaml"}})
        );
    }
}
