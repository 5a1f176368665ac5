//! # osign-core
//!
//! The signing engine for OSIGN service orders.
//!
//! This crate provides:
//! - The collaborator traits (`OrderStore`, `BlobStore`, `AuditSink`,
//!   `Notifier`, `IpLookup`, `DocumentRenderer`)
//! - Integrity hashing, identity validation and the lifecycle rules
//! - The `FinalizationCoordinator`, which completes each order at most once
//! - Document assembly and the notification gateway
//! - `SigningEngine`, the operations facade wiring all of the above
//!
//! ## Usage
//!
//! ```rust,ignore
//! use osign_core::SigningEngine;
//!
//! let engine = SigningEngine::new(store, blobs, audit, notifier, ip_lookup, renderer, config);
//! let receipt = engine.submit_signature(signer_id, claim, device).await?;
//! ```

pub mod assembly;
pub mod engine;
pub mod finalize;
pub mod identity;
pub mod integrity;
pub mod lifecycle;
pub mod notify;
mod record;
pub mod traits;

pub use assembly::{EvidenceBlock, EvidenceDocument, TextPageRenderer};
pub use engine::SigningEngine;
pub use finalize::{FinalizationCoordinator, FinalizationReport};
pub use notify::NotificationGateway;
