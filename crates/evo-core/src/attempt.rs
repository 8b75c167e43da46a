//! A single generate → extract → verify cycle.

use serde::{Deserialize, Serialize};

/// How one attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// The candidate compiled and produced a binary.
    Success,
    /// The compiler rejected the candidate; the diagnostic is recoverable
    /// feedback for the next attempt.
    CompileFailure,
    /// The completion service failed (unreachable, timeout, bad status,
    /// empty response). Terminal for the loop.
    ServiceFailure,
    /// The build environment failed (compiler missing, spawn error,
    /// compile timeout). Terminal for the loop, distinct from
    /// `CompileFailure` because it says nothing about the candidate.
    InfrastructureFailure,
}

impl AttemptOutcome {
    /// Whether this outcome lets the loop continue to another attempt.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AttemptOutcome::CompileFailure)
    }
}

/// Record of one loop iteration.
///
/// Immutable once its outcome is recorded; past attempts are never revised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-indexed position in the run, strictly increasing.
    pub sequence_number: u32,
    /// The instruction sent to the completion service this attempt.
    pub prompt_text: String,
    /// Unprocessed service response. Absent if the service call failed.
    pub raw_completion: Option<String>,
    /// Source text extracted from `raw_completion`, as handed to the
    /// verifier. Absent if no completion was obtained.
    pub candidate_source: Option<String>,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
    /// Compiler error text or service/infrastructure error description.
    /// Present exactly when `outcome != Success`.
    pub diagnostic: Option<String>,
}

impl Attempt {
    /// One-line status for progress output.
    pub fn format_status(&self) -> String {
        match (&self.outcome, &self.diagnostic) {
            (AttemptOutcome::Success, _) => {
                format!("attempt {}: success", self.sequence_number)
            }
            (outcome, Some(diag)) => {
                let first = diag.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
                format!("attempt {}: {:?} - {}", self.sequence_number, outcome, first)
            }
            (outcome, None) => format!("attempt {}: {:?}", self.sequence_number, outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_compile_failure_is_recoverable() {
        assert!(AttemptOutcome::CompileFailure.is_recoverable());
        assert!(!AttemptOutcome::Success.is_recoverable());
        assert!(!AttemptOutcome::ServiceFailure.is_recoverable());
        assert!(!AttemptOutcome::InfrastructureFailure.is_recoverable());
    }

    #[test]
    fn test_format_status_uses_first_diagnostic_line() {
        let attempt = Attempt {
            sequence_number: 2,
            prompt_text: "write a program".to_string(),
            raw_completion: Some("```c\nint main\n```".to_string()),
            candidate_source: Some("int main".to_string()),
            outcome: AttemptOutcome::CompileFailure,
            diagnostic: Some("error: expected '(' after 'main'\nnote: ...".to_string()),
        };
        let status = attempt.format_status();
        assert!(status.contains("attempt 2"));
        assert!(status.contains("expected '('"));
        assert!(!status.contains("note:"));
    }
}
