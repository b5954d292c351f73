//! Clinical reasoning error types

use crate::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Fatal - the operation cannot produce any result
    Fatal,
    /// Error - the operation failed
    Error,
    /// Warning - potential issue but processing continued
    Warning,
    /// Information - informational message
    Information,
}

impl Severity {
    /// FHIR `issue-severity` code
    pub fn as_code(&self) -> &'static str {
        match self {
            Severity::Fatal => "fatal",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A diagnostic message with context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Element or expression the diagnostic refers to
    pub expression: Option<String>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            expression: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(expression) = &self.expression {
            write!(f, " ({})", expression)?;
        }
        Ok(())
    }
}

/// Main clinical reasoning error type
#[derive(Debug, Clone, Error)]
pub enum CrError {
    /// Malformed input or violated construction invariant
    #[error("{code}: {message}")]
    Precondition {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Library, model or resource could not be resolved
    #[error("{code}: {message}")]
    Resolution {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Terminology expansion or membership failed
    #[error("{code}: {message}")]
    Terminology {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Translation or expression evaluation failed
    #[error("{code}: {message}")]
    Evaluation {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// FHIR version range or configuration not supported
    #[error("{code}: {message}")]
    Unsupported {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Repository or internal failure
    #[error("{code}: {message}")]
    System {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },
}

impl CrError {
    pub fn precondition(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Precondition {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn resolution(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Resolution {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn terminology(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Terminology {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn evaluation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Evaluation {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn unsupported(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Unsupported {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Attach context (e.g. the identifier being resolved)
    pub fn with_context(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            Self::Precondition { context, .. }
            | Self::Resolution { context, .. }
            | Self::Terminology { context, .. }
            | Self::Evaluation { context, .. }
            | Self::Unsupported { context, .. }
            | Self::System { context, .. } => *context = Some(value.into()),
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Precondition { code, .. }
            | Self::Resolution { code, .. }
            | Self::Terminology { code, .. }
            | Self::Evaluation { code, .. }
            | Self::Unsupported { code, .. }
            | Self::System { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Precondition { message, .. }
            | Self::Resolution { message, .. }
            | Self::Terminology { message, .. }
            | Self::Evaluation { message, .. }
            | Self::Unsupported { message, .. }
            | Self::System { message, .. } => message,
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Precondition { context, .. }
            | Self::Resolution { context, .. }
            | Self::Terminology { context, .. }
            | Self::Evaluation { context, .. }
            | Self::Unsupported { context, .. }
            | Self::System { context, .. } => context.as_deref(),
        }
    }

    /// Data-related failures (missing library, bad expression, terminology
    /// content) are reported to callers as an OperationOutcome payload.
    /// Everything else (malformed input, version or configuration gaps,
    /// system failures) is surfaced as a hard error.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Resolution { .. } | Self::Terminology { .. } | Self::Evaluation { .. }
        )
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let severity = match self {
            Self::Unsupported { .. } | Self::System { .. } => Severity::Fatal,
            _ => Severity::Error,
        };
        let mut diag = Diagnostic::error(self.code(), self.message());
        diag.severity = severity;
        if let Some(context) = self.context() {
            diag = diag.with_expression(context);
        }
        if let Some(help) = self.code().info().help {
            diag = diag.with_help(help);
        }
        diag
    }
}
