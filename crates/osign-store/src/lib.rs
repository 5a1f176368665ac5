//! # osign-store
//!
//! In-process backends for the OSIGN engine's persistence contracts.
//!
//! `InMemoryOrderStore` serializes every transaction behind one async lock,
//! which gives the conditional updates and the finalization claim the same
//! single-winner semantics a relational store gives a guarded `UPDATE`.
//! `InMemoryBlobStore` is a path-keyed map with overwrite semantics.
//!
//! Both carry a `set_unavailable` switch for exercising degraded paths.

pub mod blobs;
pub mod orders;

pub use blobs::InMemoryBlobStore;
pub use orders::InMemoryOrderStore;
