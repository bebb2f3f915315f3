//! Inline link metadata stored as a trailing HTML comment on a reminder line.
//!
//! ```text
//! - [ ] Buy milk due:2024-01-01 <!-- tasklink:{"id":"T1","checksum":"9c0d..."} -->
//! ```

use crate::model::LinkMetadata;

const BLOCK_OPEN: &str = "<!-- tasklink:";
const BLOCK_CLOSE: &str = "-->";

/// Result of looking for a metadata block in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataParse {
    Present(LinkMetadata),
    Absent,
    /// A block marker exists but its contents failed validation.
    Malformed(String),
}

/// Parses the trailing metadata block of `line`.
pub fn parse(line: &str) -> MetadataParse {
    let Some(start) = line.rfind(BLOCK_OPEN) else {
        return MetadataParse::Absent;
    };
    let rest = &line[start + BLOCK_OPEN.len()..];
    let Some(end) = rest.find(BLOCK_CLOSE) else {
        return MetadataParse::Malformed("unterminated metadata block".to_string());
    };
    if !rest[end + BLOCK_CLOSE.len()..].trim().is_empty() {
        return MetadataParse::Malformed("text after metadata block".to_string());
    }

    let body = rest[..end].trim();
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => return MetadataParse::Malformed(format!("invalid JSON: {}", e)),
    };
    match (field(&value, "id"), field(&value, "checksum")) {
        (Some(id), Some(checksum)) => MetadataParse::Present(LinkMetadata {
            id: id.to_string(),
            checksum: checksum.to_string(),
        }),
        (None, _) => MetadataParse::Malformed("missing or empty 'id'".to_string()),
        (_, None) => MetadataParse::Malformed("missing or empty 'checksum'".to_string()),
    }
}

fn field<'a>(value: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    value
        .get(name)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Returns the link metadata of `line`, treating malformed blocks as absent.
pub fn decode(line: &str) -> Option<LinkMetadata> {
    match parse(line) {
        MetadataParse::Present(meta) => Some(meta),
        MetadataParse::Absent | MetadataParse::Malformed(_) => None,
    }
}

/// Removes the trailing metadata block (well-formed or not) from `line`.
pub fn strip(line: &str) -> &str {
    match line.rfind(BLOCK_OPEN) {
        Some(start) => line[..start].trim_end(),
        None => line,
    }
}

/// Replaces the metadata block of `line`; `None` removes it.
pub fn encode(line: &str, meta: Option<&LinkMetadata>) -> String {
    let base = strip(line);
    match meta {
        Some(meta) => format!(
            "{} {}{{\"id\":{},\"checksum\":{}}} {}",
            base,
            BLOCK_OPEN,
            serde_json::Value::from(meta.id.as_str()),
            serde_json::Value::from(meta.checksum.as_str()),
            BLOCK_CLOSE
        ),
        None => base.to_string(),
    }
}
