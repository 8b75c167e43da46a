//! # evo-core
//!
//! Core types for the generate-compile-repair loop.
//!
//! A loop run is an ordered sequence of [`Attempt`]s, each covering one
//! generate → extract → verify cycle, closed out by a [`LoopResult`] whose
//! [`FinalOutcome`] says why the loop stopped. Every attempt's prompt, raw
//! completion, extracted candidate and diagnostic are retained so a failed
//! run can be audited after the fact.
//!
//! This crate is deliberately dependency-light; the HTTP client, the
//! compiler invocation and the loop orchestration live in their own crates.

pub mod attempt;
pub mod cancel;
pub mod objective;
pub mod result;

pub use attempt::{Attempt, AttemptOutcome};
pub use cancel::CancelToken;
pub use objective::{Objective, RepairContext};
pub use result::{AbortReason, FinalOutcome, LoopResult};
