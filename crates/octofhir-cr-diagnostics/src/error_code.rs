//! Clinical reasoning error codes following a structured numbering system
//!
//! Error code ranges:
//! - CR0001-CR0099: Precondition errors (malformed input, invariant violations)
//! - CR0100-CR0199: Resolution errors (libraries, models, resources)
//! - CR0200-CR0299: Terminology errors
//! - CR0300-CR0399: Translation and evaluation errors
//! - CR0400-CR0499: Version support and configuration errors
//! - CR0500-CR0599: System errors (repository I/O, internal)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_precondition_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_resolution_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_terminology_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Version support gaps and configuration problems (0400-0499)
    pub const fn is_support_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    pub const fn is_system_error(&self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CR{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Precondition errors (0001-0099)
    map.insert(1, ErrorInfo::new("Invalid argument"));
    map.insert(2, ErrorInfo::new("Missing required argument"));
    map.insert(
        3,
        ErrorInfo::new("Mutually exclusive inputs")
            .with_help("Supply exactly one of canonical, id or resource"),
    );
    map.insert(4, ErrorInfo::new("Mismatched FHIR versions"));
    map.insert(5, ErrorInfo::new("Invalid reference"));
    map.insert(6, ErrorInfo::new("Invalid canonical URL"));

    // Resolution errors (0100-0199)
    map.insert(100, ErrorInfo::new("Library not found"));
    map.insert(101, ErrorInfo::new("Library content not found"));
    map.insert(
        102,
        ErrorInfo::new("Library version not found")
            .with_help("The requested version is not present and fallback to latest is disabled"),
    );
    map.insert(103, ErrorInfo::new("ModelInfo not found"));
    map.insert(104, ErrorInfo::new("Resource not found"));
    map.insert(105, ErrorInfo::new("Invalid attachment data"));
    map.insert(106, ErrorInfo::new("ModelInfo parse failed"));
    map.insert(107, ErrorInfo::new("Circular library include"));
    map.insert(108, ErrorInfo::new("Launch context not resolved"));

    // Terminology errors (0200-0299)
    map.insert(200, ErrorInfo::new("ValueSet not found"));
    map.insert(
        201,
        ErrorInfo::new("Unsupported ValueSet compose")
            .with_help("Only plain concept lists can be expanded without a pre-computed expansion"),
    );
    map.insert(202, ErrorInfo::new("Terminology operation failed"));
    map.insert(203, ErrorInfo::new("No terminology delegates configured"));

    // Translation and evaluation errors (0300-0399)
    map.insert(300, ErrorInfo::new("Library translation failed"));
    map.insert(301, ErrorInfo::new("Evaluation failed"));
    map.insert(302, ErrorInfo::new("Retrieve failed"));
    map.insert(303, ErrorInfo::new("Undefined expression"));

    // Version support and configuration errors (0400-0499)
    map.insert(400, ErrorInfo::new("Not implemented for FHIR version range"));
    map.insert(401, ErrorInfo::new("Invalid version dispatch table"));
    map.insert(402, ErrorInfo::new("Unsupported repository operation"));
    map.insert(403, ErrorInfo::new("Configuration error"));

    // System errors (0500-0599)
    map.insert(500, ErrorInfo::new("Internal error"));
    map.insert(501, ErrorInfo::new("I/O error"));
    map.insert(502, ErrorInfo::new("Repository failure"));

    map
});

// Precondition errors
pub const CR0001: ErrorCode = ErrorCode::new(1);
pub const CR0002: ErrorCode = ErrorCode::new(2);
pub const CR0003: ErrorCode = ErrorCode::new(3);
pub const CR0004: ErrorCode = ErrorCode::new(4);
pub const CR0005: ErrorCode = ErrorCode::new(5);
pub const CR0006: ErrorCode = ErrorCode::new(6);

// Resolution errors
pub const CR0100: ErrorCode = ErrorCode::new(100);
pub const CR0101: ErrorCode = ErrorCode::new(101);
pub const CR0102: ErrorCode = ErrorCode::new(102);
pub const CR0103: ErrorCode = ErrorCode::new(103);
pub const CR0104: ErrorCode = ErrorCode::new(104);
pub const CR0105: ErrorCode = ErrorCode::new(105);
pub const CR0106: ErrorCode = ErrorCode::new(106);
pub const CR0107: ErrorCode = ErrorCode::new(107);
pub const CR0108: ErrorCode = ErrorCode::new(108);

// Terminology errors
pub const CR0200: ErrorCode = ErrorCode::new(200);
pub const CR0201: ErrorCode = ErrorCode::new(201);
pub const CR0202: ErrorCode = ErrorCode::new(202);
pub const CR0203: ErrorCode = ErrorCode::new(203);

// Translation and evaluation errors
pub const CR0300: ErrorCode = ErrorCode::new(300);
pub const CR0301: ErrorCode = ErrorCode::new(301);
pub const CR0302: ErrorCode = ErrorCode::new(302);
pub const CR0303: ErrorCode = ErrorCode::new(303);

// Version support and configuration errors
pub const CR0400: ErrorCode = ErrorCode::new(400);
pub const CR0401: ErrorCode = ErrorCode::new(401);
pub const CR0402: ErrorCode = ErrorCode::new(402);
pub const CR0403: ErrorCode = ErrorCode::new(403);

// System errors
pub const CR0500: ErrorCode = ErrorCode::new(500);
pub const CR0501: ErrorCode = ErrorCode::new(501);
pub const CR0502: ErrorCode = ErrorCode::new(502);
