//! OperationOutcome rendering of diagnostics

use crate::{CrError, Diagnostic, ErrorCode, Severity};
use serde_json::{Value, json};

/// FHIR `issue-type` code for an error code
pub fn issue_type(code: ErrorCode) -> &'static str {
    match code.code() {
        100..=104 | 200 => "not-found",
        1..=99 => "invalid",
        105..=199 | 201..=299 | 300..=399 => "processing",
        400..=499 => "not-supported",
        _ => "exception",
    }
}

/// An OperationOutcome under construction
#[derive(Debug, Clone, Default)]
pub struct OperationOutcome {
    issues: Vec<Diagnostic>,
}

impl OperationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome with a single issue describing `error`
    pub fn from_error(error: &CrError) -> Self {
        let mut outcome = Self::new();
        outcome.push(error.to_diagnostic());
        outcome
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.issues.push(diagnostic);
    }

    pub fn issues(&self) -> &[Diagnostic] {
        &self.issues
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|d| matches!(d.severity, Severity::Error | Severity::Fatal))
    }

    /// Render as a FHIR OperationOutcome resource
    pub fn to_resource(&self) -> Value {
        let issues: Vec<Value> = self
            .issues
            .iter()
            .map(|d| {
                let mut issue = json!({
                    "severity": d.severity.as_code(),
                    "code": issue_type(d.code),
                    "details": { "coding": [{ "code": d.code.to_string() }] },
                    "diagnostics": d.message,
                });
                if let Some(expression) = &d.expression {
                    issue["expression"] = json!([expression]);
                }
                issue
            })
            .collect();

        json!({
            "resourceType": "OperationOutcome",
            "issue": issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CR0100, CR0201, CR0400};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outcome_from_missing_library() {
        let err = CrError::resolution(CR0100, "Unable to locate Library Common")
            .with_context("Library/Common");
        let resource = OperationOutcome::from_error(&err).to_resource();

        assert_eq!(resource["resourceType"], "OperationOutcome");
        assert_eq!(resource["issue"][0]["severity"], "error");
        assert_eq!(resource["issue"][0]["code"], "not-found");
        assert_eq!(resource["issue"][0]["details"]["coding"][0]["code"], "CR0100");
        assert_eq!(resource["issue"][0]["expression"][0], "Library/Common");
    }

    #[test]
    fn test_issue_types() {
        assert_eq!(issue_type(CR0201), "processing");
        assert_eq!(issue_type(CR0400), "not-supported");
    }

    #[test]
    fn test_warning_only_outcome_has_no_errors() {
        let mut outcome = OperationOutcome::new();
        outcome.push(Diagnostic::warning(CR0201, "partial expansion"));
        assert!(!outcome.has_errors());
    }
}
