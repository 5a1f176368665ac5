//! # osign-audit
//!
//! Append-only audit trail for OSIGN orders, hash-chained per order.
//!
//! ## Overview
//!
//! Every entry appended through `AuditSink` is redacted, then wrapped in a
//! `ChainedEvent` linked to the order's previous event by its SHA-256 hash.
//! Editing any stored event breaks the chain and `verify_chain` reports it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use osign_audit::InMemoryAuditTrail;
//! use osign_core::traits::AuditSink;
//!
//! let trail = InMemoryAuditTrail::new();
//! trail.append(&entry).await?;
//! assert!(trail.verify_integrity(entry.os_id)?);
//! ```

pub mod chain;
pub mod event;
pub mod memory;
pub mod redact;

pub use chain::{hash_event, verify_chain};
pub use event::{AuditTrail, ChainedEvent};
pub use memory::InMemoryAuditTrail;
pub use redact::redact_metadata;

// ── Tests ─────────────────────────────────────────────────────────────────────
