//! Content hashing and canonical-payload hashing.
//!
//! Three hashes make up an order's integrity chain:
//!
//!   1. `file_hash`        — `hash_bytes` over the original upload
//!   2. `signature_hash`   — `hash_canonical_payload` over a signer's evidence,
//!                           which itself embeds (1)
//!   3. `final_file_hash`  — `hash_bytes` over the assembled artifact, whose
//!                           evidence page prints (1) and every (2)
//!
//! Canonical payloads are encoded with RFC 8785 JSON (sorted keys, no
//! insignificant whitespace) so the same record always hashes the same way.

use serde::Serialize;
use sha2::{Digest, Sha256};

use osign_contracts::{
    error::{OsignError, OsignResult},
    order::OrderId,
    signer::{SignatureData, Signer, SignerId},
};

/// SHA-256 over raw bytes, as 64 lowercase hex characters.
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over the canonical JSON encoding of `payload`.
pub fn hash_canonical_payload<T: Serialize + ?Sized>(payload: &T) -> OsignResult<String> {
    let canonical = serde_jcs::to_vec(payload).map_err(|e| OsignError::Internal {
        reason: format!("payload cannot be canonicalized: {}", e),
    })?;
    Ok(hash_bytes(&canonical))
}

/// The record a signature hash commits to.
#[derive(Serialize)]
struct SignaturePayload<'a> {
    os_id: &'a OrderId,
    signer_id: &'a SignerId,
    evidence: &'a SignatureData,
}

/// Hash of one signer's evidence record, bound to its order and signer ids.
pub fn signature_hash(
    os_id: &OrderId,
    signer_id: &SignerId,
    evidence: &SignatureData,
) -> OsignResult<String> {
    hash_canonical_payload(&SignaturePayload { os_id, signer_id, evidence })
}

/// Recompute a signed signer's hash and compare it to the stored one.
///
/// Returns `false` for signers without evidence or without a stored hash.
pub fn verify_signer(signer: &Signer) -> bool {
    match (&signer.signature_data, &signer.signature_hash) {
        (Some(evidence), Some(stored)) => signature_hash(&signer.os_id, &signer.id, evidence)
            .map(|recomputed| &recomputed == stored)
            .unwrap_or(false),
        _ => false,
    }
}
