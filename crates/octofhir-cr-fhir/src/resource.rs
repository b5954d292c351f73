//! Read-only views over JSON resources

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use octofhir_cr_diagnostics::{CR0105, CrError};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("attachment data of type '{content_type}' is not valid base64: {reason}")]
    InvalidData { content_type: String, reason: String },
}

impl From<AttachmentError> for CrError {
    fn from(err: AttachmentError) -> Self {
        CrError::resolution(CR0105, err.to_string())
    }
}

/// `resourceType` of a resource
pub fn resource_type(resource: &Value) -> Option<&str> {
    resource.get("resourceType").and_then(Value::as_str)
}

/// Logical id of a resource
pub fn resource_id(resource: &Value) -> Option<&str> {
    resource.get("id").and_then(Value::as_str)
}

/// Knowledge artifact identity: `name`, `version` and canonical `url`
pub trait VersionedResource {
    fn name(&self) -> Option<&str>;
    fn version(&self) -> Option<&str>;
    fn url(&self) -> Option<&str>;
}

impl VersionedResource for Value {
    fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    fn version(&self) -> Option<&str> {
        self.get("version").and_then(Value::as_str)
    }

    fn url(&self) -> Option<&str> {
        self.get("url").and_then(Value::as_str)
    }
}

/// Borrowed view over an `Attachment` element
#[derive(Debug, Clone, Copy)]
pub struct Attachment<'a> {
    content_type: Option<&'a str>,
    data: Option<&'a str>,
}

impl<'a> Attachment<'a> {
    pub fn from_value(value: &'a Value) -> Self {
        Self {
            content_type: value.get("contentType").and_then(Value::as_str),
            data: value.get("data").and_then(Value::as_str),
        }
    }

    pub fn content_type(&self) -> Option<&'a str> {
        self.content_type
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Decoded bytes; `None` when the attachment carries no inline data
    pub fn data(&self) -> Result<Option<Vec<u8>>, AttachmentError> {
        let Some(encoded) = self.data else {
            return Ok(None);
        };
        // Some servers wrap base64 at 76 columns
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map(Some)
            .map_err(|e| AttachmentError::InvalidData {
                content_type: self.content_type.unwrap_or_default().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Attachments of `content` in declaration order
pub fn attachments(resource: &Value) -> impl Iterator<Item = Attachment<'_>> {
    resource
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(Attachment::from_value)
}

/// Encode bytes as an attachment element
pub fn attachment(content_type: &str, data: &[u8]) -> Value {
    serde_json::json!({
        "contentType": content_type,
        "data": STANDARD.encode(data),
    })
}
