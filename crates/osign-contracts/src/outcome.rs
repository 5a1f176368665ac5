//! Results returned by the engine's operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    audit::AuditEntry,
    order::{FinalArtifact, Order, OrderId, OrderStatus},
    signer::{Signer, SignerId},
};

/// What the finalization check observed for one triggering mutation.
///
/// `RaceLost` is expected under concurrency and is never surfaced as an
/// error: the caller simply sees a completed order on its next read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalizationOutcome {
    /// The all-signed condition does not hold.
    NotReady,
    /// Another execution claimed the completion first.
    RaceLost,
    /// This execution claimed completion and attached the artifact.
    Finalized { artifact: FinalArtifact },
    /// This execution claimed completion but the artifact is missing.
    ///
    /// The order is legally complete; the artifact needs reprocessing.
    Degraded { reason: String },
}

impl FinalizationOutcome {
    /// True when this execution won the claim, with or without an artifact.
    pub fn claimed(&self) -> bool {
        matches!(self, Self::Finalized { .. } | Self::Degraded { .. })
    }
}

/// Evidence summary handed back to a signer after a successful signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureReceipt {
    pub os_id: OrderId,
    pub signer_id: SignerId,
    pub signature_hash: String,
    pub document_hash: String,
    pub ip_address: String,
    pub signed_at: DateTime<Utc>,
    /// Order status as this call left it: `Completed` only when this call
    /// won the finalization claim.
    pub order_status: OrderStatus,
    pub signed_count: u32,
    pub total_signers: u32,
    pub finalization: FinalizationOutcome,
    /// Secondary steps that degraded after the signature was recorded.
    pub warnings: Vec<String>,
}

/// Result of removing a signer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalReport {
    pub order: Order,
    pub finalization: FinalizationOutcome,
    pub warnings: Vec<String>,
}

/// Result of an order deletion. Cleanup failures are reported, not fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionReport {
    pub signers_removed: usize,
    pub audit_events_removed: usize,
    pub blobs_removed: Vec<String>,
    pub warnings: Vec<String>,
}

/// Which stored hash a document matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMatch {
    Original,
    Final,
    None,
}

/// Result of checking a document against an order's recorded hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVerification {
    pub os_id: OrderId,
    pub computed_hash: String,
    pub matched: DocumentMatch,
}

/// A consistent read of an order, its signers and its audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order: Order,
    /// Sorted by `order_index`.
    pub signers: Vec<Signer>,
    pub audit: Vec<AuditEntry>,
}
