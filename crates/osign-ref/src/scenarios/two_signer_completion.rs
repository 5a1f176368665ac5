//! Scenario A: two signers sign one after the other.
//!
//!   1. Order created with 2 signers → `Pending`, both asked to sign
//!   2. Signer 1 signs → `PartialSigned`, signed_count 1
//!   3. Signer 2 signs → claim won, evidence page assembled,
//!      `Completed` with the final artifact attached
//!   4. Both signers receive the finalized notice

use osign_config::EngineConfig;
use osign_contracts::{
    error::OsignResult,
    outcome::{OrderSnapshot, SignatureReceipt},
};

use crate::{
    invariants::violations,
    mock_data::{claim_for, desktop_device, sample_order},
    runtime::ReferenceRuntime,
};

pub struct CompletionRun {
    pub first: SignatureReceipt,
    pub second: SignatureReceipt,
    pub snapshot: OrderSnapshot,
}

pub async fn execute(runtime: &ReferenceRuntime) -> OsignResult<CompletionRun> {
    let engine = &runtime.engine;
    let order = engine.create_order(sample_order("OS-2024-0101", 2)).await?;
    let signers = engine.order_snapshot(order.id).await?.signers;

    let first = engine
        .submit_signature(signers[0].id, claim_for(0), desktop_device())
        .await?;
    let second = engine
        .submit_signature(signers[1].id, claim_for(1), desktop_device())
        .await?;

    let snapshot = engine.order_snapshot(order.id).await?;
    Ok(CompletionRun { first, second, snapshot })
}

/// Run Scenario A and print each step.
pub async fn run_scenario(config: &EngineConfig) -> OsignResult<()> {
    println!("=== Scenario A: Sequential completion ===");
    println!();

    let runtime = ReferenceRuntime::from_config(config.clone());
    let run = execute(&runtime).await?;
    let order = &run.snapshot.order;

    println!("  Order:                  {} ({})", order.os_number, order.title);
    println!(
        "  After signer 1:         {} ({}/{})",
        run.first.order_status, run.first.signed_count, run.first.total_signers
    );
    println!(
        "  After signer 2:         {} ({}/{})",
        run.second.order_status, run.second.signed_count, run.second.total_signers
    );
    println!("  Finalization:           {:?}", run.second.finalization);
    println!(
        "  Final artifact:         {}",
        order.final_file_path.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Final hash:             {}",
        order.final_file_hash.as_deref().unwrap_or("(none)")
    );

    let problems = violations(&run.snapshot);
    let intact = runtime.audit.verify_integrity(order.id)?;
    println!(
        "  Audit chain integrity:  {} ({} event(s))",
        if intact { "VERIFIED" } else { "FAILED" },
        run.snapshot.audit.len()
    );
    println!(
        "  Invariants:             {}",
        if problems.is_empty() { "HOLD".to_string() } else { problems.join("; ") }
    );
    println!();
    println!("  Scenario A complete.");
    println!();
    Ok(())
}
