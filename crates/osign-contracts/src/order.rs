//! Service order aggregate types.
//!
//! An `Order` is the document package sent out for signature. It exclusively
//! owns its signers and is the only writer of the aggregate counters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signer::NewSigner;

/// Opaque identifier of a service order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub uuid::Uuid);

impl OrderId {
    /// Create a new, unique order ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Aggregate status of an order.
///
/// Only `Draft`, `Cancelled` and `Expired` are set explicitly. `Pending`,
/// `PartialSigned` and `Completed` follow from the signer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Pending,
    PartialSigned,
    Completed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::PartialSigned => "partial_signed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// References to the consolidated, signed document.
///
/// Attached only by the execution that claimed finalization, or by the
/// operator reprocessing path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalArtifact {
    pub path: String,
    pub file_name: String,
    /// SHA-256 (hex) of the assembled bytes.
    pub hash: String,
}

/// A service order as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing number, e.g. "OS-2024-0042".
    pub os_number: String,
    pub title: String,
    pub description: Option<String>,

    // Original document.
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    /// SHA-256 (hex) of the original bytes at upload time.
    pub file_hash: String,

    // Final artifact, null until completion.
    pub final_file_path: Option<String>,
    pub final_file_name: Option<String>,
    pub final_file_hash: Option<String>,

    pub total_signers: u32,
    pub signed_count: u32,
    pub status: OrderStatus,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    pub created_by: String,
    pub created_by_name: String,
}

impl Order {
    /// The final artifact references, if all three are present.
    pub fn final_artifact(&self) -> Option<FinalArtifact> {
        match (&self.final_file_path, &self.final_file_name, &self.final_file_hash) {
            (Some(path), Some(file_name), Some(hash)) => Some(FinalArtifact {
                path: path.clone(),
                file_name: file_name.clone(),
                hash: hash.clone(),
            }),
            _ => None,
        }
    }

    /// True when any final artifact field is set.
    pub fn has_final_fields(&self) -> bool {
        self.final_file_path.is_some()
            || self.final_file_name.is_some()
            || self.final_file_hash.is_some()
    }
}

/// A creator's request to open a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub os_number: String,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub file_bytes: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub created_by: String,
    pub created_by_name: String,
    /// Signers in display order; `order_index` is assigned from position.
    pub signers: Vec<NewSigner>,
    /// Keep the order in `Draft` and do not notify anyone yet.
    pub draft: bool,
}
