//! Scenario B: both signers of a 2-of-2 order sign at the same instant.
//!
//! Two tasks meet at a barrier and submit together. Whatever the
//! interleaving, the store's claim admits one winner: exactly one receipt
//! reports the flip to `Completed`, the final artifact is uploaded once and
//! the `completed` event is written once.

use std::sync::Arc;

use tokio::sync::Barrier;

use osign_config::EngineConfig;
use osign_contracts::{
    audit::AuditEventType,
    error::{OsignError, OsignResult},
    outcome::{OrderSnapshot, SignatureReceipt},
};

use crate::{
    invariants::violations,
    mock_data::{claim_for, desktop_device, sample_order},
    runtime::ReferenceRuntime,
};

pub struct RaceRun {
    pub receipts: Vec<SignatureReceipt>,
    pub snapshot: OrderSnapshot,
    /// Writes to the final artifact path.
    pub final_uploads: usize,
    pub completed_events: usize,
}

impl RaceRun {
    /// Receipts whose call won the finalization claim.
    pub fn winners(&self) -> usize {
        self.receipts.iter().filter(|r| r.finalization.claimed()).count()
    }
}

pub async fn execute(runtime: &ReferenceRuntime, os_number: &str) -> OsignResult<RaceRun> {
    let order = runtime.engine.create_order(sample_order(os_number, 2)).await?;
    let signers = runtime.engine.order_snapshot(order.id).await?.signers;

    let barrier = Arc::new(Barrier::new(signers.len()));
    let mut handles = Vec::with_capacity(signers.len());
    for (i, signer) in signers.iter().enumerate() {
        let engine = runtime.engine.clone();
        let barrier = barrier.clone();
        let signer_id = signer.id;
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.submit_signature(signer_id, claim_for(i), desktop_device()).await
        }));
    }

    let mut receipts = Vec::with_capacity(handles.len());
    for handle in handles {
        let receipt = handle.await.map_err(|e| OsignError::Internal {
            reason: format!("signing task failed: {}", e),
        })??;
        receipts.push(receipt);
    }

    let snapshot = runtime.engine.order_snapshot(order.id).await?;
    let final_path = format!(
        "{}{}",
        snapshot.order.file_path,
        runtime.engine.config().storage.final_suffix
    );
    Ok(RaceRun {
        receipts,
        final_uploads: runtime.blobs.upload_count(&final_path).await,
        completed_events: runtime.audit.count(order.id, AuditEventType::Completed)?,
        snapshot,
    })
}

/// Run Scenario B and print each step.
pub async fn run_scenario(config: &EngineConfig) -> OsignResult<()> {
    println!("=== Scenario B: Simultaneous completion ===");
    println!();

    let runtime = ReferenceRuntime::from_config(config.clone());
    let run = execute(&runtime, "OS-2024-0102").await?;

    for (i, receipt) in run.receipts.iter().enumerate() {
        println!(
            "  Signer {} response:      {} / {:?}",
            i + 1,
            receipt.order_status,
            receipt.finalization
        );
    }
    println!("  Claim winners:          {}", run.winners());
    println!("  Final uploads:          {}", run.final_uploads);
    println!("  `completed` events:     {}", run.completed_events);
    println!("  Order status on read:   {}", run.snapshot.order.status);

    let problems = violations(&run.snapshot);
    println!(
        "  Invariants:             {}",
        if problems.is_empty() { "HOLD".to_string() } else { problems.join("; ") }
    );
    println!();
    println!("  Scenario B complete.");
    println!();
    Ok(())
}
