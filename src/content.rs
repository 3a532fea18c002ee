//! Local content files: stack compose files and config/secret payloads

use portainer::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Share of control characters above which content is treated as binary
const MAX_CONTROL_RATIO: f64 = 0.3;

/// What a file is used as, for error messages ("file", "stack file")
#[derive(Debug, Clone, Copy)]
pub struct FileRole(pub &'static str);

impl FileRole {
    pub const PAYLOAD: Self = Self("file");
    pub const STACK: Self = Self("stack file");

    fn title(self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Read a whole file, refusing empty ones
pub fn read_bytes(path: &Path, role: FileRole) -> Result<Vec<u8>> {
    let p = path.display();
    let bytes = fs::read(path).map_err(|e| {
        let message = match e.kind() {
            ErrorKind::NotFound => format!("{} not found: {p}", role.title()),
            ErrorKind::PermissionDenied => format!("Permission denied reading {}: {p}", role.0),
            _ => format!("Failed to read {} {p}: {e}", role.0),
        };
        Error::content(path, message)
    })?;

    if bytes.is_empty() {
        return Err(Error::content(path, format!("{} is empty: {p}", role.title())));
    }
    log::debug!("Read {} bytes from {}", bytes.len(), p);
    Ok(bytes)
}

/// Why bytes cannot be used as text, if they cannot
pub fn binary_reason(bytes: &[u8]) -> Option<&'static str> {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return Some("invalid UTF-8 encoding");
    };
    if text.contains('\0') {
        return Some("contains null bytes");
    }

    let total = text.chars().count();
    let control = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        .count();
    if total > 0 && control as f64 / total as f64 > MAX_CONTROL_RATIO {
        return Some("too many control characters");
    }
    None
}

/// Decode bytes as text or fail with a binary-content error
pub fn validate_text(bytes: Vec<u8>, path: &Path, role: FileRole) -> Result<String> {
    if let Some(reason) = binary_reason(&bytes) {
        return Err(Error::content(
            path,
            format!(
                "{} contains binary data ({reason}): {}",
                role.title(),
                path.display()
            ),
        ));
    }
    String::from_utf8(bytes).map_err(|e| Error::content(path, e.to_string()))
}

/// Read a text file
pub fn read_text(path: &Path, role: FileRole) -> Result<String> {
    validate_text(read_bytes(path, role)?, path, role)
}
