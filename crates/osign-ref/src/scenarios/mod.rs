//! Service-order reference scenarios.
//!
//! Each scenario wires a fresh `ReferenceRuntime`, drives the engine through
//! one lifecycle path and prints what happened. `execute` returns the raw
//! results so the tests can assert on them.

pub mod cancellation;
pub mod signer_removal;
pub mod simultaneous_completion;
pub mod two_signer_completion;
