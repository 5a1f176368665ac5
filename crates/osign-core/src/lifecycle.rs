//! Signer and order lifecycle rules.
//!
//! Order status is derived, never set ad hoc: `recompute` is the single
//! function that turns a set of signer rows into `signed_count`,
//! `total_signers` and `status`, and every store transaction that touches a
//! signer calls it before committing.
//!
//! Derivation:
//!
//!   Draft / Cancelled / Expired / Completed  → kept as is
//!   signed_count == 0                        → Pending
//!   otherwise                                → PartialSigned
//!
//! `Completed` is reached only through the finalization claim, so an order
//! with `signed_count == total_signers` stays `PartialSigned` (or `Pending`)
//! until exactly one execution claims it.

use osign_contracts::{
    error::{OsignError, OsignResult},
    order::{Order, OrderStatus},
    signer::{Signer, SignerStatus},
};

/// Status implied by the counters, preserving explicitly-set statuses.
pub fn derive_status(current: OrderStatus, signed_count: u32, total_signers: u32) -> OrderStatus {
    match current {
        OrderStatus::Draft
        | OrderStatus::Cancelled
        | OrderStatus::Expired
        | OrderStatus::Completed => current,
        OrderStatus::Pending | OrderStatus::PartialSigned => {
            if signed_count == 0 || total_signers == 0 {
                OrderStatus::Pending
            } else {
                OrderStatus::PartialSigned
            }
        }
    }
}

/// Recount `signers` (all rows of `order`) into the order's counters.
pub fn recompute(order: &mut Order, signers: &[Signer]) {
    let signed = signers
        .iter()
        .filter(|s| s.status == SignerStatus::Signed)
        .count();
    order.total_signers = signers.len() as u32;
    order.signed_count = signed as u32;
    order.status = derive_status(order.status, order.signed_count, order.total_signers);
}

/// `total_signers > 0 ∧ signed_count = total_signers`.
pub fn is_all_signed(order: &Order) -> bool {
    order.total_signers > 0 && order.signed_count == order.total_signers
}

/// Orders in `Pending` or `PartialSigned` accept signatures.
pub fn ensure_signable(order: &Order) -> OsignResult<()> {
    match order.status {
        OrderStatus::Pending | OrderStatus::PartialSigned => Ok(()),
        status => Err(OsignError::OrderNotSignable {
            os_id: order.id.to_string(),
            status: status.to_string(),
        }),
    }
}

/// Only `Pending` signers can transition.
pub fn ensure_pending(signer: &Signer) -> OsignResult<()> {
    if signer.status == SignerStatus::Pending {
        Ok(())
    } else {
        Err(OsignError::AlreadyFinalized {
            signer_id: signer.id.to_string(),
            status: signer.status.to_string(),
        })
    }
}

/// A signer whose evidence is incomplete cannot be `Signed`.
pub fn ensure_signed_has_evidence(signer: &Signer) -> OsignResult<()> {
    if signer.status == SignerStatus::Signed
        && (signer.signature_data.is_none() || signer.signature_hash.is_none())
    {
        return Err(OsignError::Internal {
            reason: format!("signer {} is signed without evidence", signer.id),
        });
    }
    Ok(())
}

/// Removal needs a `Pending` signer on an order that is neither
/// `Cancelled` nor `Completed`.
pub fn ensure_removable(order: &Order, signer: &Signer) -> OsignResult<()> {
    if signer.status != SignerStatus::Pending {
        return Err(OsignError::InvalidTransition {
            reason: format!("signer {} is {} and cannot be removed", signer.id, signer.status),
        });
    }
    if matches!(order.status, OrderStatus::Cancelled | OrderStatus::Completed) {
        return Err(OsignError::InvalidTransition {
            reason: format!("signers of a {} order cannot be removed", order.status),
        });
    }
    Ok(())
}

/// Any non-terminal order can be cancelled.
pub fn ensure_cancellable(order: &Order) -> OsignResult<()> {
    if order.status.is_terminal() {
        return Err(OsignError::InvalidTransition {
            reason: format!("a {} order cannot be cancelled", order.status),
        });
    }
    Ok(())
}

/// Deletion requires `Cancelled` and at least one missing signature.
pub fn ensure_deletable(order: &Order) -> OsignResult<()> {
    if order.status != OrderStatus::Cancelled {
        return Err(OsignError::InvalidTransition {
            reason: format!("only cancelled orders can be deleted (order is {})", order.status),
        });
    }
    if order.signed_count >= order.total_signers {
        return Err(OsignError::InvalidTransition {
            reason: format!(
                "order has {} of {} signatures and cannot be deleted",
                order.signed_count, order.total_signers
            ),
        });
    }
    Ok(())
}

/// Owner-only operations.
pub fn ensure_owner(order: &Order, actor_id: &str) -> OsignResult<()> {
    if order.created_by == actor_id {
        Ok(())
    } else {
        Err(OsignError::Forbidden {
            reason: format!("only the creator of order {} may do this", order.os_number),
        })
    }
}

/// Signers who receive the cancellation notice: anyone who signed or is
/// still pending.
pub fn cancellation_recipients(signers: &[Signer]) -> Vec<&Signer> {
    signers
        .iter()
        .filter(|s| s.signature_data.is_some() || s.status == SignerStatus::Pending)
        .collect()
}

/// Open orders are those still collecting signatures.
pub fn is_open(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Pending | OrderStatus::PartialSigned)
}
