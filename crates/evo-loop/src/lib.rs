//! # evo-loop
//!
//! The generate-compile-repair loop: prompt a completion service for a
//! program, compile the result, and feed compiler diagnostics back into
//! the next prompt until a candidate builds or the attempt budget runs out.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐     ┌───────────┐     ┌─────────────┐
//! │ Objective │ ──> │  Prompt   │ ──> │ Completion  │
//! │           │     │  Builder  │     │  Service    │
//! └───────────┘     └───────────┘     └──────┬──────┘
//!                                            │
//!                   ┌────────────────────────┘
//!                   ▼
//!            ┌─────────────┐     ┌─────────────┐
//!            │    Code     │ ──> │    Build    │
//!            │  Extractor  │     │  Verifier   │
//!            └─────────────┘     └──────┬──────┘
//!                                       │
//!              (compile failure)        │ (success)
//!                   ┌───────────────────┤
//!                   ▼                   ▼
//!            ┌─────────────┐     ┌─────────────┐
//!            │   Repair    │     │   Source +  │
//!            │   Prompt    │     │   Binary    │
//!            └─────────────┘     └─────────────┘
//! ```
//!
//! A run is strictly sequential: one attempt fully completes before the
//! next begins. Service and infrastructure failures abort the loop; only
//! compile failures are retried.
//!
//! # Usage
//!
//! ```bash
//! # Generate a C program against a local completion service
//! cargo run -p evo-loop --bin evolve -- \
//!     --objective "print the first 10 primes" --compiler gcc
//! ```

pub mod controller;
pub mod extract;
pub mod progress;
pub mod prompt;

pub use controller::{
    BuildBackend, CompletionBackend, ConfigError, LoopConfig, LoopController,
};
pub use extract::CodeExtractor;
pub use progress::{LoopState, ProgressSnapshot, ProgressTracker};
pub use prompt::PromptBuilder;
