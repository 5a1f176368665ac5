//! Collaborator contracts consumed by the signing engine.
//!
//! The engine owns no I/O of its own. Everything it persists, uploads, sends
//! or looks up goes through one of these traits:
//!
//! - `OrderStore`       — orders and signers, with transactional recompute
//!                        and conditional status updates
//! - `BlobStore`        — document bytes keyed by path
//! - `AuditSink`        — append-only event log
//! - `Notifier`         — outbound email
//! - `IpLookup`         — best-effort public IP of the signing session
//! - `DocumentRenderer` — turns an evidence model into document bytes

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use osign_contracts::{
    audit::AuditEntry,
    error::OsignResult,
    order::{FinalArtifact, Order, OrderId, OrderStatus},
    signer::{Signer, SignerId, SignerTransition},
};

use crate::assembly::EvidenceDocument;

/// The persistent store for orders and signers.
///
/// Every method that changes a signer row must, in the same transaction,
/// recompute the owning order with `lifecycle::recompute` so that
/// `signed_count` and `status` are never observable out of step with the
/// signer rows.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order and all of its signers as one batch.
    async fn insert_order(&self, order: &Order, signers: &[Signer]) -> OsignResult<()>;

    async fn order(&self, os_id: OrderId) -> OsignResult<Option<Order>>;

    async fn signer(&self, signer_id: SignerId) -> OsignResult<Option<Signer>>;

    /// All signers of an order, sorted by `order_index`.
    async fn signers(&self, os_id: OrderId) -> OsignResult<Vec<Signer>>;

    /// Apply a terminal transition to a `Pending` signer and recompute the
    /// owning order, atomically.
    ///
    /// Must fail with `AlreadyFinalized` if the signer is no longer
    /// `Pending`, and with `OrderNotSignable` if the order does not accept
    /// signatures, both checked inside the transaction. Returns the order as
    /// committed.
    async fn apply_transition(&self, transition: &SignerTransition) -> OsignResult<Order>;

    /// Delete a `Pending` signer and recompute the owning order, atomically.
    ///
    /// Must fail with `InvalidTransition` if the signer is not `Pending` or
    /// the order is `Cancelled` or `Completed`.
    async fn remove_signer(&self, signer_id: SignerId) -> OsignResult<Order>;

    /// Set `status = next` only if the current status equals `expected`.
    ///
    /// Returns `false` when the condition did not hold (zero rows updated),
    /// and when `next` is `Cancelled` or `Expired` but the order is
    /// all-signed. Never used for `Completed`; see `claim_completion`.
    async fn update_status(
        &self,
        os_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> OsignResult<bool>;

    /// The finalization claim.
    ///
    /// Sets `status = Completed` and `completed_at` only if the current status
    /// equals `expected`, `expected` is not `Completed`, and the order is
    /// all-signed. Exactly one concurrent caller can observe `true`.
    async fn claim_completion(
        &self,
        os_id: OrderId,
        expected: OrderStatus,
        completed_at: DateTime<Utc>,
    ) -> OsignResult<bool>;

    /// Store the final artifact references on a `Completed` order.
    ///
    /// Must fail with `InvalidTransition` for any other status.
    async fn attach_final_artifact(&self, os_id: OrderId, artifact: &FinalArtifact)
        -> OsignResult<()>;

    /// Move an open order to `Expired` and expire its `Pending` signers in
    /// the same transaction. Returns `false` if the order was not open or
    /// is all-signed.
    async fn expire_order(&self, os_id: OrderId) -> OsignResult<bool>;

    async fn record_reminder(&self, signer_id: SignerId, at: DateTime<Utc>) -> OsignResult<()>;

    /// Orders in `Pending` or `PartialSigned` whose deadline is at or before `now`.
    async fn open_orders_expiring_by(&self, now: DateTime<Utc>) -> OsignResult<Vec<Order>>;

    /// Delete every signer row of an order. Returns how many were removed.
    async fn delete_signers(&self, os_id: OrderId) -> OsignResult<usize>;

    /// Delete the order row itself.
    async fn delete_order(&self, os_id: OrderId) -> OsignResult<()>;
}

/// Object storage keyed by path.
///
/// A missing object is a normal condition and is reported as `None` or
/// `false`, never as an error.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing object.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> OsignResult<()>;

    async fn download(&self, path: &str) -> OsignResult<Option<Vec<u8>>>;

    async fn exists(&self, path: &str) -> OsignResult<bool>;

    /// A time-limited URL for sharing, or `None` if nothing is stored at `path`.
    async fn signed_url(&self, path: &str, ttl: Duration) -> OsignResult<Option<String>>;

    /// Returns `true` if an object was removed.
    async fn remove(&self, path: &str) -> OsignResult<bool>;
}

/// The append-only audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry. Implementations redact sensitive metadata.
    async fn append(&self, entry: &AuditEntry) -> OsignResult<()>;

    /// Entries of one order in append order.
    async fn events_for(&self, os_id: OrderId) -> OsignResult<Vec<AuditEntry>>;

    /// Remove every entry of an order. Only used by order deletion.
    async fn erase(&self, os_id: OrderId) -> OsignResult<usize>;
}

/// One outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
}

/// The external email collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> OsignResult<()>;
}

/// Best-effort lookup of the signing session's public IP.
#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn public_ip(&self) -> OsignResult<String>;
}

/// Produces the final document from the original bytes and the evidence
/// model. CPU-bound and deterministic for equal inputs.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, original: &[u8], evidence: &EvidenceDocument) -> OsignResult<Vec<u8>>;
}
