//! Hash-chain primitives: event hashing and chain integrity verification.
//!
//! Each order has its own chain. An event's hash is SHA-256 over a fixed
//! concatenation of byte sequences, and every field that contributes to it
//! is listed here so nothing is accidentally left out.
//!
//! Hash input layout (bytes, in order):
//!   1. os_id as its hyphenated UUID string
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. RFC 8785 canonical JSON of the (already redacted) entry

use sha2::{Digest, Sha256};

use osign_contracts::{
    audit::AuditEntry,
    error::{OsignError, OsignResult},
    order::OrderId,
};

use crate::event::ChainedEvent;

/// Compute the SHA-256 hash of a single chained event.
///
/// The hash commits to the order the event belongs to (`os_id`), its
/// position in that order's chain (`sequence`), its link to the previous
/// event (`prev_hash`) and the full entry, metadata included.
///
/// Returns a lowercase 64-character hex string.
///
/// # Errors
///
/// `AuditWriteFailed` if the entry cannot be canonicalized. Entries whose
/// metadata is a `serde_json::Value` always can be.
pub fn hash_event(
    os_id: &OrderId,
    sequence: u64,
    entry: &AuditEntry,
    prev_hash: &str,
) -> OsignResult<String> {
    // JCS fixes key order and number formatting, so equal entries hash
    // equally regardless of how their metadata map was built.
    let entry_json = serde_jcs::to_vec(entry).map_err(|e| OsignError::AuditWriteFailed {
        reason: format!("entry cannot be canonicalized: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(os_id.to_string().as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&entry_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of one order's chain.
///
/// Returns `true` when the chain satisfies all three rules:
///
/// 1. **Sequence numbering**: event `i` carries `sequence == i`.
/// 2. **Prev-hash linkage**: each event's `prev_hash` equals the
///    `this_hash` of the preceding event (or `GENESIS_HASH` for event 0).
/// 3. **Hash correctness**: each event's `this_hash` matches the value
///    recomputed from its own fields.
///
/// Returns `false` at the first mismatch. An empty chain is valid, since an
/// erased or never-audited order has no events.
pub fn verify_chain(events: &[ChainedEvent]) -> bool {
    let mut expected_prev = ChainedEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        // Rule 1: no gaps, no reordering.
        if event.sequence != position as u64 {
            return false;
        }

        // Rule 2: the stored prev_hash must match what we expect.
        if event.prev_hash != expected_prev {
            return false;
        }

        // Rule 3: recompute this_hash and compare to the stored value. An
        // entry that no longer canonicalizes counts as tampered.
        match hash_event(&event.os_id, event.sequence, &event.entry, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        // Advance the expected prev_hash to this event's hash.
        expected_prev = event.this_hash.clone();
    }

    true
}
