//! Scenario C: the owner cancels a partially signed order, then deletes it.
//!
//!   1. Order with 3 signers; signer 1 signs
//!   2. Owner cancels → `Cancelled`, notices to all three signers
//!   3. Signer 2 tries to sign → `OrderNotSignable`
//!   4. Owner deletes: 1 of 3 signed, so deletion is allowed

use osign_config::EngineConfig;
use osign_contracts::{
    error::{OsignError, OsignResult},
    order::Order,
    outcome::DeletionReport,
};

use crate::{
    mock_data::{claim_for, desktop_device, sample_order, OWNER_ID},
    runtime::ReferenceRuntime,
};

pub struct CancellationRun {
    pub cancelled: Order,
    /// What the late signature attempt returned.
    pub late_signature: OsignError,
    pub deletion: DeletionReport,
    /// Error from reading the order after deletion.
    pub after_delete: OsignError,
}

pub async fn execute(runtime: &ReferenceRuntime) -> OsignResult<CancellationRun> {
    let engine = &runtime.engine;
    let order = engine.create_order(sample_order("OS-2024-0103", 3)).await?;
    let signers = engine.order_snapshot(order.id).await?.signers;

    engine
        .submit_signature(signers[0].id, claim_for(0), desktop_device())
        .await?;

    let cancelled = engine
        .cancel_order(order.id, OWNER_ID, Some("Equipamento devolvido antes da entrega"))
        .await?;

    let late_signature = match engine
        .submit_signature(signers[1].id, claim_for(1), desktop_device())
        .await
    {
        Ok(receipt) => {
            return Err(OsignError::Internal {
                reason: format!("cancelled order accepted a signature: {:?}", receipt.signature_hash),
            })
        }
        Err(e) => e,
    };

    let deletion = engine.delete_order(order.id, OWNER_ID).await?;

    let after_delete = match engine.order_snapshot(order.id).await {
        Ok(_) => {
            return Err(OsignError::Internal {
                reason: "deleted order is still readable".to_string(),
            })
        }
        Err(e) => e,
    };

    Ok(CancellationRun { cancelled, late_signature, deletion, after_delete })
}

/// Run Scenario C and print each step.
pub async fn run_scenario(config: &EngineConfig) -> OsignResult<()> {
    println!("=== Scenario C: Cancellation and deletion ===");
    println!();

    let runtime = ReferenceRuntime::from_config(config.clone());
    let run = execute(&runtime).await?;

    println!(
        "  After cancel:           {} ({}/{} signed)",
        run.cancelled.status, run.cancelled.signed_count, run.cancelled.total_signers
    );
    println!("  Late signature:         {}", run.late_signature);
    println!(
        "  Deletion:               {} signer(s), {} audit event(s), {} blob(s) removed",
        run.deletion.signers_removed,
        run.deletion.audit_events_removed,
        run.deletion.blobs_removed.len()
    );
    println!("  Read after delete:      {}", run.after_delete);
    println!();
    println!("  Scenario C complete.");
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use osign_contracts::order::OrderStatus;

    use super::*;

    #[tokio::test]
    async fn cancelled_order_rejects_signatures_and_can_be_deleted() {
        let runtime = ReferenceRuntime::new();
        let run = execute(&runtime).await.unwrap();

        assert_eq!(run.cancelled.status, OrderStatus::Cancelled);
        assert_eq!(run.cancelled.signed_count, 1);
        assert!(matches!(run.late_signature, OsignError::OrderNotSignable { .. }));

        assert_eq!(run.deletion.signers_removed, 3);
        assert!(run.deletion.audit_events_removed > 0);
        assert_eq!(run.deletion.blobs_removed.len(), 1);
        assert!(run.deletion.warnings.is_empty());
        assert!(matches!(run.after_delete, OsignError::NotFound { entity: "order", .. }));
        assert!(runtime.blobs.paths().await.is_empty());
    }

    #[tokio::test]
    async fn every_signed_or_pending_signer_is_told() {
        let runtime = ReferenceRuntime::new();
        execute(&runtime).await.unwrap();

        let subject = &runtime.engine.config().notifications.cancelled_subject;
        assert_eq!(runtime.notifier.count_subject(subject), 3);
        let notice = runtime
            .notifier
            .sent()
            .into_iter()
            .find(|m| m.subject.starts_with(subject.as_str()))
            .unwrap();
        assert!(notice.html_body.contains("Equipamento devolvido"));
    }
}
