//! Loop orchestration: up to `max_attempts` generate → extract → verify
//! cycles, with compiler diagnostics fed back into repair prompts.
//!
//! State machine:
//!
//! ```text
//! Generating ──(completion + extraction)──> Verifying
//! Generating ──(any ServiceError)─────────> Aborted        (terminal)
//! Verifying  ──(BuildOutcome::Success)────> Succeeded      (terminal)
//! Verifying  ──(CompileFailure, n < max)──> Retrying ──> Generating
//! Verifying  ──(CompileFailure, n = max)──> Exhausted      (terminal)
//! Verifying  ──(any VerifierError)────────> Aborted        (terminal)
//! ```
//!
//! Only compile failures are retried. Service-layer failures and
//! infrastructure failures (compiler missing, timeout) are terminal:
//! resubmitting the same request will not make an unreachable backend
//! reachable, and "fix this" prompts built from environment errors would
//! send the model chasing defects the code does not have.

use std::time::Duration;

use evo_client::{CompletionClient, ServiceError};
use evo_core::{
    AbortReason, Attempt, AttemptOutcome, CancelToken, FinalOutcome, LoopResult, Objective,
    RepairContext,
};
use evo_verifier::{first_error_line, BuildOutcome, BuildVerifier, VerifierError};

use crate::extract::CodeExtractor;
use crate::progress::{LoopState, ProgressTracker};
use crate::prompt::PromptBuilder;

/// Source of completions. Implemented by [`CompletionClient`]; tests use
/// scripted stubs.
#[allow(async_fn_in_trait)]
pub trait CompletionBackend {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String, ServiceError>;
}

impl CompletionBackend for CompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String, ServiceError> {
        CompletionClient::complete(self, prompt, temperature, timeout).await
    }
}

/// Compiles and classifies candidates. Implemented by [`BuildVerifier`];
/// tests use scripted stubs.
#[allow(async_fn_in_trait)]
pub trait BuildBackend {
    async fn verify(&self, source: &str, sequence: u32) -> Result<BuildOutcome, VerifierError>;
}

impl BuildBackend for BuildVerifier {
    async fn verify(&self, source: &str, sequence: u32) -> Result<BuildOutcome, VerifierError> {
        BuildVerifier::verify(self, source, sequence).await
    }
}

/// Loop configuration.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Attempt budget, >= 1. With 1, the loop performs exactly one
    /// generate-verify cycle and never retries.
    pub max_attempts: u32,
    /// Sampling temperature for the first attempt.
    pub initial_temperature: f32,
    /// Sampling temperature for repair attempts. Defaults lower than the
    /// initial temperature to reduce variance in the fix.
    pub repair_temperature: f32,
    /// Bound on one completion round-trip.
    pub request_timeout: Duration,
    /// Whether to print progress output.
    pub verbose: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_temperature: 0.8,
            repair_temperature: 0.4,
            request_timeout: Duration::from_secs(120),
            verbose: false,
        }
    }
}

impl LoopConfig {
    /// Quick config for fast iteration.
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            request_timeout: Duration::from_secs(60),
            verbose: true,
            ..Default::default()
        }
    }

    /// Thorough config: a larger budget and colder repairs.
    pub fn thorough() -> Self {
        Self {
            max_attempts: 10,
            repair_temperature: 0.2,
            verbose: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts < 1 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        for temperature in [self.initial_temperature, self.repair_temperature] {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(ConfigError::TemperatureOutOfRange(temperature));
            }
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Rejected loop configurations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_attempts must be >= 1")]
    ZeroMaxAttempts,

    #[error("temperature {0} is outside [0, 1]")]
    TemperatureOutOfRange(f32),

    #[error("request timeout must be positive")]
    ZeroTimeout,
}

/// Drives the generate-compile-repair loop.
///
/// Strictly single-threaded and sequential: each attempt's service
/// round-trip and compile fully complete before the next attempt begins,
/// so a diagnostic can only ever influence prompts with larger sequence
/// numbers.
pub struct LoopController<C, V> {
    completion: C,
    verifier: V,
    config: LoopConfig,
    progress: ProgressTracker,
}

impl<C: CompletionBackend, V: BuildBackend> LoopController<C, V> {
    pub fn new(completion: C, verifier: V, config: LoopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            completion,
            verifier,
            config,
            progress: ProgressTracker::new(),
        })
    }

    /// Handle for read-only progress snapshots.
    pub fn progress(&self) -> ProgressTracker {
        self.progress.clone()
    }

    /// Run the loop to a terminal outcome.
    ///
    /// Cancellation is checked at the top of each iteration, before a new
    /// completion request is issued; an in-flight call is allowed to
    /// finish, but no new attempt starts after cancellation is observed.
    pub async fn run(&self, objective: &Objective, cancel: &CancelToken) -> LoopResult {
        let extractor = CodeExtractor::for_language(&objective.language);
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut repair: Option<RepairContext> = None;

        for sequence in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                if self.config.verbose {
                    println!("Cancellation observed, stopping before attempt {}", sequence);
                }
                self.progress
                    .enter(LoopState::Aborted, sequence, attempts.len());
                return LoopResult::new(
                    attempts,
                    FinalOutcome::Aborted {
                        reason: AbortReason::Cancelled,
                    },
                );
            }

            let prompt = match &repair {
                Some(context) => PromptBuilder::build_repair_prompt(objective, context),
                None => PromptBuilder::build_initial_prompt(objective),
            };
            let temperature = if repair.is_none() {
                self.config.initial_temperature
            } else {
                self.config.repair_temperature
            };

            if self.config.verbose {
                println!(
                    "=== Attempt {}/{} (temperature {:.2}) ===",
                    sequence, self.config.max_attempts, temperature
                );
            }
            self.progress
                .enter(LoopState::Generating, sequence, attempts.len());

            let raw = match self
                .completion
                .complete(&prompt, temperature, self.config.request_timeout)
                .await
            {
                Ok(raw) => raw,
                Err(error) => {
                    return self.abort_service(attempts, sequence, prompt, None, error);
                }
            };

            if raw.trim().is_empty() {
                return self.abort_service(
                    attempts,
                    sequence,
                    prompt,
                    Some(raw),
                    ServiceError::EmptyResponse,
                );
            }

            let candidate = extractor.extract(&raw);
            if self.config.verbose {
                println!("Extracted {} lines of candidate source", candidate.lines().count());
            }
            self.progress
                .enter(LoopState::Verifying, sequence, attempts.len());

            match self.verifier.verify(&candidate, sequence).await {
                Ok(BuildOutcome::Success {
                    source_path,
                    binary_path,
                }) => {
                    attempts.push(Attempt {
                        sequence_number: sequence,
                        prompt_text: prompt,
                        raw_completion: Some(raw),
                        candidate_source: Some(candidate.clone()),
                        outcome: AttemptOutcome::Success,
                        diagnostic: None,
                    });
                    if self.config.verbose {
                        println!("Build succeeded: {}", binary_path.display());
                    }
                    self.progress
                        .enter(LoopState::Succeeded, sequence, attempts.len());
                    return LoopResult::new(
                        attempts,
                        FinalOutcome::Success {
                            candidate_source: candidate,
                            source_path,
                            binary_path,
                        },
                    );
                }
                Ok(BuildOutcome::CompileFailure { diagnostic }) => {
                    if self.config.verbose {
                        println!("Build failed: {}", first_error_line(&diagnostic));
                    }
                    attempts.push(Attempt {
                        sequence_number: sequence,
                        prompt_text: prompt,
                        raw_completion: Some(raw),
                        candidate_source: Some(candidate.clone()),
                        outcome: AttemptOutcome::CompileFailure,
                        diagnostic: Some(diagnostic.clone()),
                    });
                    if sequence == self.config.max_attempts {
                        self.progress
                            .enter(LoopState::Exhausted, sequence, attempts.len());
                        return LoopResult::new(attempts, FinalOutcome::Exhausted);
                    }
                    self.progress
                        .enter(LoopState::Retrying, sequence, attempts.len());
                    repair = Some(RepairContext {
                        previous_source: candidate,
                        diagnostic,
                    });
                }
                Err(error) => {
                    let detail = error.to_string();
                    if self.config.verbose {
                        println!("Build infrastructure failure: {}", detail);
                    }
                    attempts.push(Attempt {
                        sequence_number: sequence,
                        prompt_text: prompt,
                        raw_completion: Some(raw),
                        candidate_source: Some(candidate),
                        outcome: AttemptOutcome::InfrastructureFailure,
                        diagnostic: Some(detail.clone()),
                    });
                    self.progress
                        .enter(LoopState::Aborted, sequence, attempts.len());
                    return LoopResult::new(
                        attempts,
                        FinalOutcome::Aborted {
                            reason: AbortReason::Infrastructure { detail },
                        },
                    );
                }
            }
        }

        // Reachable only with max_attempts == 0, which validate() rejects.
        LoopResult::new(attempts, FinalOutcome::Exhausted)
    }

    fn abort_service(
        &self,
        mut attempts: Vec<Attempt>,
        sequence: u32,
        prompt: String,
        raw_completion: Option<String>,
        error: ServiceError,
    ) -> LoopResult {
        let detail = error.to_string();
        if self.config.verbose {
            println!("Service failure: {}", detail);
        }
        attempts.push(Attempt {
            sequence_number: sequence,
            prompt_text: prompt,
            raw_completion,
            candidate_source: None,
            outcome: AttemptOutcome::ServiceFailure,
            diagnostic: Some(detail.clone()),
        });
        self.progress
            .enter(LoopState::Aborted, sequence, attempts.len());
        LoopResult::new(
            attempts,
            FinalOutcome::Aborted {
                reason: AbortReason::Service { detail },
            },
        )
    }
}
