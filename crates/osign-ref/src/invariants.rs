//! Whole-order consistency checks run after every scenario.

use osign_contracts::{
    order::OrderStatus,
    outcome::OrderSnapshot,
    signer::SignerStatus,
};
use osign_core::{integrity::verify_signer, lifecycle::ensure_signed_has_evidence};

/// Every broken invariant of one order, as readable lines. Empty is good.
pub fn violations(snapshot: &OrderSnapshot) -> Vec<String> {
    let order = &snapshot.order;
    let mut found = Vec::new();

    let signed = snapshot
        .signers
        .iter()
        .filter(|s| s.status == SignerStatus::Signed)
        .count() as u32;
    if order.signed_count != signed {
        found.push(format!(
            "signed_count {} but {} signers are signed",
            order.signed_count, signed
        ));
    }
    if order.total_signers as usize != snapshot.signers.len() {
        found.push(format!(
            "total_signers {} but {} signer rows",
            order.total_signers,
            snapshot.signers.len()
        ));
    }

    if order.has_final_fields() && order.status != OrderStatus::Completed {
        found.push(format!("final artifact attached to a {} order", order.status));
    }
    if order.has_final_fields() && order.final_artifact().is_none() {
        found.push("final artifact fields partially set".to_string());
    }
    if (order.status == OrderStatus::Completed) != order.completed_at.is_some() {
        found.push(format!(
            "status {} with completed_at {:?}",
            order.status, order.completed_at
        ));
    }
    if order.status == OrderStatus::Completed
        && (order.total_signers == 0 || order.signed_count != order.total_signers)
    {
        found.push(format!(
            "completed with {} of {} signatures",
            order.signed_count, order.total_signers
        ));
    }

    for signer in &snapshot.signers {
        if let Err(e) = ensure_signed_has_evidence(signer) {
            found.push(e.to_string());
        }
        if signer.status == SignerStatus::Signed && !verify_signer(signer) {
            found.push(format!("signature hash of signer {} does not verify", signer.id));
        }
    }

    found
}
