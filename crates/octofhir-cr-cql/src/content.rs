//! Attachment content extraction
//!
//! Libraries and model infos carry their payload in `content[]`
//! attachments. Extraction picks the first attachment, in declaration
//! order, whose `contentType` equals the requested MIME type exactly.

use octofhir_cr_diagnostics::{CR0001, CrError};
use octofhir_cr_fhir::{AttachmentError, attachments};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error("unknown content type '{0}'")]
    UnknownContentType(String),
}

impl From<ContentError> for CrError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Attachment(e) => e.into(),
            ContentError::UnknownContentType(mime) => {
                CrError::precondition(CR0001, format!("unknown content type '{mime}'"))
            }
        }
    }
}

/// A MIME type content can be extracted for
pub trait ContentType: Copy + fmt::Debug {
    fn mime(self) -> &'static str;
}

/// Library representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LibraryContentType {
    #[serde(rename = "text/cql")]
    Cql,
    #[serde(rename = "application/elm+xml")]
    ElmXml,
    #[serde(rename = "application/elm+json")]
    ElmJson,
}

impl LibraryContentType {
    pub const ALL: [LibraryContentType; 3] = [
        LibraryContentType::Cql,
        LibraryContentType::ElmXml,
        LibraryContentType::ElmJson,
    ];

    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.mime() == mime)
    }

    pub fn is_elm(self) -> bool {
        !matches!(self, LibraryContentType::Cql)
    }
}

impl ContentType for LibraryContentType {
    fn mime(self) -> &'static str {
        match self {
            LibraryContentType::Cql => "text/cql",
            LibraryContentType::ElmXml => "application/elm+xml",
            LibraryContentType::ElmJson => "application/elm+json",
        }
    }
}

impl FromStr for LibraryContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_mime(s).ok_or_else(|| ContentError::UnknownContentType(s.to_string()))
    }
}

impl fmt::Display for LibraryContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Model info representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelInfoContentType {
    Xml,
    Json,
}

impl ModelInfoContentType {
    pub const ALL: [ModelInfoContentType; 2] = [ModelInfoContentType::Xml, ModelInfoContentType::Json];
}

impl ContentType for ModelInfoContentType {
    fn mime(self) -> &'static str {
        match self {
            ModelInfoContentType::Xml => "application/xml",
            ModelInfoContentType::Json => "application/json",
        }
    }
}

/// Bytes of the first attachment of `resource` declared as `content_type`.
///
/// `Ok(None)` means the resource exists but has no usable content of that
/// type, which callers must keep distinct from a missing resource.
pub fn get_content(resource: &Value, content_type: impl ContentType) -> Result<Option<Vec<u8>>, ContentError> {
    let mime = content_type.mime();
    match attachments(resource).find(|a| a.content_type() == Some(mime)) {
        Some(attachment) => Ok(attachment.data()?),
        None => Ok(None),
    }
}

/// Content types present on `resource`, in declaration order
pub fn library_content_types(resource: &Value) -> Vec<LibraryContentType> {
    attachments(resource)
        .filter_map(|a| a.content_type().and_then(LibraryContentType::from_mime))
        .collect()
}
