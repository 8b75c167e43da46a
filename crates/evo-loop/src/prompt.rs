//! Prompt construction for initial generation and repair rounds.
//!
//! The repair prompt embeds the compiler diagnostic verbatim and restates
//! the original objective unchanged, so the model fixes the reported
//! defect instead of reinventing the program.

use evo_core::{Objective, RepairContext};

/// Builds the instructions sent to the completion service.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Prompt for the first attempt. Contains the objective and the output
    /// format contract, never any diagnostic text.
    pub fn build_initial_prompt(objective: &Objective) -> String {
        format!(
            r#"Write a complete, compilable {language} program.

## OBJECTIVE

{description}

## RULES

1. The program must be self-contained: standard library only, no external dependencies.
2. It must compile cleanly with a standard {language} compiler.
3. Return ONLY the source code in a ```{language} code block. No explanations outside the code."#,
            language = objective.language,
            description = objective.description,
        )
    }

    /// Prompt for a repair round. The previous source and the compiler
    /// diagnostic are included verbatim; the objective is restated
    /// unchanged.
    pub fn build_repair_prompt(objective: &Objective, context: &RepairContext) -> String {
        format!(
            r#"Your previous {language} program failed to compile.

## ORIGINAL OBJECTIVE (unchanged)

{description}

## PREVIOUS SOURCE

```{language}
{previous_source}
```

## COMPILER DIAGNOSTIC

```
{diagnostic}
```

## TASK

Fix only the defect reported above. Preserve the original objective; do not
redesign parts of the program that already work.

Return ONLY the corrected source code in a ```{language} code block. No explanations outside the code."#,
            language = objective.language,
            description = objective.description,
            previous_source = context.previous_source,
            diagnostic = context.diagnostic,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objective() -> Objective {
        Objective::new("print the first 10 primes, one per line", "c")
    }

    #[test]
    fn test_initial_prompt_states_objective_and_format() {
        let prompt = PromptBuilder::build_initial_prompt(&objective());
        assert!(prompt.contains("first 10 primes"));
        assert!(prompt.contains("```c"));
        // No repair scaffolding on the first attempt.
        assert!(!prompt.contains("DIAGNOSTIC"));
        assert!(!prompt.contains("PREVIOUS SOURCE"));
    }

    #[test]
    fn test_repair_prompt_embeds_diagnostic_verbatim() {
        let context = RepairContext {
            previous_source: "int main(void) { return 0 }".to_string(),
            diagnostic: "attempt_001.c:1:27: error: expected ';' before '}'".to_string(),
        };
        let prompt = PromptBuilder::build_repair_prompt(&objective(), &context);
        assert!(prompt.contains(&context.diagnostic));
        assert!(prompt.contains(&context.previous_source));
        // The original requirement travels with every repair round.
        assert!(prompt.contains("first 10 primes"));
        assert!(prompt.contains("Fix only the defect"));
    }
}
