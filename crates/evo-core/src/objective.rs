//! What the loop is asked to produce, and what a repair round carries.

use serde::{Deserialize, Serialize};

/// The initial requirement for a loop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    /// Natural-language description of the program to generate.
    pub description: String,
    /// Target language tag. Selects the code-fence tag requested from the
    /// model and the extension of the candidate source file (e.g. "c").
    pub language: String,
}

impl Objective {
    #[must_use]
    pub fn new(description: impl Into<String>, language: impl Into<String>) -> Self {
        let description = description.into();
        let language = language.into();
        debug_assert!(!description.trim().is_empty(), "Objective must not be empty");
        debug_assert!(!language.trim().is_empty(), "Language tag must not be empty");
        Self {
            description,
            language,
        }
    }
}

/// Feedback carried from a failed attempt into the next prompt.
///
/// Kept as a typed value rather than pre-spliced prompt text so the
/// controller → prompt-builder contract stays testable independent of
/// exact wording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairContext {
    /// The candidate source the compiler rejected.
    pub previous_source: String,
    /// The compiler's stderr, verbatim.
    pub diagnostic: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_construction() {
        let objective = Objective::new("print the 10th prime", "c");
        assert_eq!(objective.language, "c");
        assert!(objective.description.contains("prime"));
    }
}
