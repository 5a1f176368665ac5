//! Scenario D: removing the last pending signer completes the order.
//!
//!   1. Order with 3 signers; signers 1 and 2 sign → 2/3
//!   2. Owner removes signer 3 → total 2, signed 2
//!   3. The removal itself triggers finalization: `Completed`, artifact
//!      attached, no sign event involved

use osign_config::EngineConfig;
use osign_contracts::{error::OsignResult, outcome::RemovalReport};

use crate::{
    invariants::violations,
    mock_data::{claim_for, desktop_device, sample_order, OWNER_ID},
    runtime::ReferenceRuntime,
};

pub async fn execute(runtime: &ReferenceRuntime) -> OsignResult<RemovalReport> {
    let engine = &runtime.engine;
    let order = engine.create_order(sample_order("OS-2024-0104", 3)).await?;
    let signers = engine.order_snapshot(order.id).await?.signers;

    for (i, signer) in signers.iter().take(2).enumerate() {
        engine
            .submit_signature(signer.id, claim_for(i), desktop_device())
            .await?;
    }

    engine.remove_signer(signers[2].id, OWNER_ID).await
}

/// Run Scenario D and print each step.
pub async fn run_scenario(config: &EngineConfig) -> OsignResult<()> {
    println!("=== Scenario D: Completion by signer removal ===");
    println!();

    let runtime = ReferenceRuntime::from_config(config.clone());
    let report = execute(&runtime).await?;
    let snapshot = runtime.engine.order_snapshot(report.order.id).await?;

    println!(
        "  After removal:          {} ({}/{} signed)",
        report.order.status, report.order.signed_count, report.order.total_signers
    );
    println!("  Finalization:           {:?}", report.finalization);
    println!(
        "  Final artifact:         {}",
        report.order.final_file_path.as_deref().unwrap_or("(none)")
    );

    let problems = violations(&snapshot);
    println!(
        "  Invariants:             {}",
        if problems.is_empty() { "HOLD".to_string() } else { problems.join("; ") }
    );
    println!();
    println!("  Scenario D complete.");
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use osign_contracts::{
        audit::AuditEventType, order::OrderStatus, outcome::FinalizationOutcome,
    };

    use super::*;

    #[tokio::test]
    async fn removal_finalizes_the_order() {
        let runtime = ReferenceRuntime::new();
        let report = execute(&runtime).await.unwrap();

        assert!(matches!(report.finalization, FinalizationOutcome::Finalized { .. }));
        assert_eq!(report.order.status, OrderStatus::Completed);
        assert_eq!(report.order.total_signers, 2);
        assert_eq!(report.order.signed_count, 2);
        assert!(report.order.final_artifact().is_some());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let snapshot = runtime.engine.order_snapshot(report.order.id).await.unwrap();
        assert_eq!(snapshot.signers.len(), 2);
        assert!(violations(&snapshot).is_empty());
    }

    #[tokio::test]
    async fn completion_follows_the_removal_event() {
        let runtime = ReferenceRuntime::new();
        let report = execute(&runtime).await.unwrap();
        let audit = runtime.engine.order_snapshot(report.order.id).await.unwrap().audit;

        let removed = audit
            .iter()
            .position(|e| e.event_type == AuditEventType::SignerRemoved)
            .unwrap();
        let completed = audit
            .iter()
            .position(|e| e.event_type == AuditEventType::Completed)
            .unwrap();
        assert!(removed < completed);
        assert_eq!(
            audit.iter().filter(|e| e.event_type == AuditEventType::Signed).count(),
            2
        );
    }
}
