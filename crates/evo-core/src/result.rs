//! Terminal record of a full loop run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::attempt::{Attempt, AttemptOutcome};

/// Why a run was aborted without exhausting its attempt budget.
///
/// Service and infrastructure failures are terminal by design: an
/// unreachable backend or a missing compiler will not be fixed by
/// resubmitting the same request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AbortReason {
    #[error("completion service failure: {detail}")]
    Service { detail: String },

    #[error("build infrastructure failure: {detail}")]
    Infrastructure { detail: String },

    #[error("cancelled by caller")]
    Cancelled,
}

/// Terminal outcome of a loop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FinalOutcome {
    /// A candidate compiled. Carries the winning source text and the
    /// on-disk artifacts so callers can pick them up.
    Success {
        candidate_source: String,
        source_path: PathBuf,
        binary_path: PathBuf,
    },
    /// Every attempt compiled with errors; the attempt budget is spent.
    Exhausted,
    /// The loop stopped early for a non-code reason.
    Aborted { reason: AbortReason },
}

/// The full record of a loop run: every attempt in chronological order,
/// plus the terminal outcome. Nothing is discarded, so an operator can
/// reconstruct why the loop stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopResult {
    /// Insertion order = chronological order.
    pub attempts: Vec<Attempt>,
    pub final_outcome: FinalOutcome,
}

impl LoopResult {
    /// Assemble a result, checking the outcome/attempt invariants.
    #[must_use]
    pub fn new(attempts: Vec<Attempt>, final_outcome: FinalOutcome) -> Self {
        if matches!(final_outcome, FinalOutcome::Success { .. }) {
            debug_assert!(
                attempts
                    .last()
                    .is_some_and(|a| a.outcome == AttemptOutcome::Success),
                "Success requires the last attempt to have succeeded"
            );
        }
        if matches!(final_outcome, FinalOutcome::Exhausted) {
            debug_assert!(
                attempts
                    .iter()
                    .all(|a| a.outcome != AttemptOutcome::Success),
                "Exhausted requires no successful attempt"
            );
        }
        Self {
            attempts,
            final_outcome,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.final_outcome, FinalOutcome::Success { .. })
    }

    /// Format as a summary string.
    pub fn format_summary(&self) -> String {
        let status = match &self.final_outcome {
            FinalOutcome::Success { .. } => "SUCCESS",
            FinalOutcome::Exhausted => "EXHAUSTED",
            FinalOutcome::Aborted { .. } => "ABORTED",
        };
        let mut summary = format!(
            "[{}] Loop finished after {} attempt(s)\n",
            status,
            self.attempts.len()
        );

        match &self.final_outcome {
            FinalOutcome::Success {
                candidate_source,
                source_path,
                binary_path,
            } => {
                summary.push_str(&format!(
                    "  Source: {} ({} lines)\n",
                    source_path.display(),
                    candidate_source.lines().count()
                ));
                summary.push_str(&format!("  Binary: {}\n", binary_path.display()));
            }
            FinalOutcome::Exhausted => {
                summary.push_str("  Attempt budget spent without a clean compile.\n");
            }
            FinalOutcome::Aborted { reason } => {
                summary.push_str(&format!("  Reason: {}\n", reason));
            }
        }

        for attempt in &self.attempts {
            summary.push_str(&format!("  {}\n", attempt.format_status()));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(sequence: u32, outcome: AttemptOutcome, diagnostic: Option<&str>) -> Attempt {
        Attempt {
            sequence_number: sequence,
            prompt_text: "objective".to_string(),
            raw_completion: Some("raw".to_string()),
            candidate_source: Some("code".to_string()),
            outcome,
            diagnostic: diagnostic.map(str::to_string),
        }
    }

    #[test]
    fn test_summary_lists_every_attempt() {
        let result = LoopResult::new(
            vec![
                attempt(1, AttemptOutcome::CompileFailure, Some("missing semicolon")),
                attempt(2, AttemptOutcome::CompileFailure, Some("undefined symbol foo")),
            ],
            FinalOutcome::Exhausted,
        );
        let summary = result.format_summary();
        assert!(summary.contains("EXHAUSTED"));
        assert!(summary.contains("2 attempt(s)"));
        assert!(summary.contains("missing semicolon"));
        assert!(summary.contains("undefined symbol foo"));
    }

    #[test]
    fn test_abort_reason_display() {
        let reason = AbortReason::Service {
            detail: "connection refused".to_string(),
        };
        assert!(reason.to_string().contains("connection refused"));
        assert_eq!(AbortReason::Cancelled.to_string(), "cancelled by caller");
    }

    #[test]
    fn test_history_serializes_to_json() {
        let result = LoopResult::new(
            vec![attempt(1, AttemptOutcome::Success, None)],
            FinalOutcome::Success {
                candidate_source: "code".to_string(),
                source_path: PathBuf::from("/tmp/run/attempt_001.c"),
                binary_path: PathBuf::from("/tmp/run/attempt_001.bin"),
            },
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("attempt_001.c"));
        assert!(json.contains("\"Success\""));
    }
}
