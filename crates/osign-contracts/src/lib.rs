//! # osign-contracts
//!
//! Shared types, evidence records, and error contracts for the OSIGN
//! service-order signing engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod audit;
pub mod error;
pub mod order;
pub mod outcome;
pub mod signer;
