//! Chained audit event and exported trail types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use osign_contracts::{audit::AuditEntry, order::OrderId};

/// One link in an order's hash chain.
///
/// Changing any field, including those of the wrapped `entry`, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedEvent {
    /// Position in the order's chain, starting at 0.
    pub sequence: u64,

    pub os_id: OrderId,

    /// The entry as stored, after redaction.
    pub entry: AuditEntry,

    /// `this_hash` of the previous event, or `GENESIS_HASH`.
    pub prev_hash: String,

    /// SHA-256 (hex) over (os_id, sequence, prev_hash, canonical entry).
    pub this_hash: String,
}

impl ChainedEvent {
    /// `prev_hash` of the first event of every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A copy of one order's full chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    pub os_id: OrderId,
    pub events: Vec<ChainedEvent>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last event. Empty when there are no events.
    pub head_hash: String,
}
