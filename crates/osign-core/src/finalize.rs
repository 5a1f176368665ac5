//! The finalization coordinator.
//!
//! Runs after every mutation that can change `signed_count` or
//! `total_signers` and guarantees that completion side effects happen at most
//! once per order:
//!
//!   re-read order ─► all signed? ─► claim (CAS on status) ─► assemble
//!        │               │ no            │ lost                 │
//!        │               ▼               ▼                      ▼
//!        │           NotReady         RaceLost          attach artifact
//!        │                                                      │
//!        └──────────────────────────────────────────── `completed` audit
//!                                                               │
//!                                                      finalized notices
//!
//! The claim is the only step that needs a strict ordering guarantee; it is
//! delegated to `OrderStore::claim_completion`, which succeeds for exactly
//! one concurrent caller. Everything after the claim runs only in the
//! winning execution.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use osign_config::{AssemblyConfig, StorageConfig};
use osign_contracts::{
    audit::{AuditEntry, AuditEventType},
    error::{OsignError, OsignResult},
    order::{FinalArtifact, Order, OrderId, OrderStatus},
    outcome::FinalizationOutcome,
    signer::SignerStatus,
};

use crate::{
    assembly::assemble,
    lifecycle::{is_all_signed, is_open},
    notify::NotificationGateway,
    record::append_audit,
    traits::{AuditSink, BlobStore, DocumentRenderer, OrderStore},
};

/// The outcome of one finalization check plus any soft warnings.
#[derive(Debug, Clone)]
pub struct FinalizationReport {
    pub outcome: FinalizationOutcome,
    pub warnings: Vec<String>,
}

impl FinalizationReport {
    fn quiet(outcome: FinalizationOutcome) -> Self {
        Self { outcome, warnings: Vec::new() }
    }
}

pub struct FinalizationCoordinator {
    store: Arc<dyn OrderStore>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditSink>,
    gateway: Arc<NotificationGateway>,
    renderer: Arc<dyn DocumentRenderer>,
    assembly: AssemblyConfig,
    storage: StorageConfig,
}

impl FinalizationCoordinator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditSink>,
        gateway: Arc<NotificationGateway>,
        renderer: Arc<dyn DocumentRenderer>,
        assembly: AssemblyConfig,
        storage: StorageConfig,
    ) -> Self {
        Self { store, blobs, audit, gateway, renderer, assembly, storage }
    }

    /// Check the all-signed condition against the store and, if it holds,
    /// try to claim and perform the completion.
    pub async fn check(&self, os_id: OrderId) -> OsignResult<FinalizationReport> {
        let order = self
            .store
            .order(os_id)
            .await?
            .ok_or_else(|| OsignError::order_not_found(os_id))?;

        if !is_all_signed(&order) {
            return Ok(FinalizationReport::quiet(FinalizationOutcome::NotReady));
        }
        if order.status == OrderStatus::Completed {
            debug!(os_id = %os_id, "order already completed, nothing to claim");
            return Ok(FinalizationReport::quiet(FinalizationOutcome::RaceLost));
        }
        if !is_open(order.status) {
            debug!(os_id = %os_id, status = %order.status, "all signed but order is closed");
            return Ok(FinalizationReport::quiet(FinalizationOutcome::NotReady));
        }

        let completed_at = Utc::now();
        if !self.store.claim_completion(os_id, order.status, completed_at).await? {
            debug!(os_id = %os_id, "finalization claimed by another execution");
            return Ok(FinalizationReport::quiet(FinalizationOutcome::RaceLost));
        }

        info!(
            os_id = %os_id,
            signed_count = order.signed_count,
            total_signers = order.total_signers,
            "finalization claimed"
        );

        let claimed = Order {
            status: OrderStatus::Completed,
            completed_at: Some(completed_at),
            ..order
        };
        Ok(self.complete(&claimed).await)
    }

    /// Completion side effects. Only called by the claim winner.
    async fn complete(&self, order: &Order) -> FinalizationReport {
        let mut warnings = Vec::new();

        let outcome = match self.produce_artifact(order).await {
            Ok(artifact) => match self.store.attach_final_artifact(order.id, &artifact).await {
                Ok(()) => FinalizationOutcome::Finalized { artifact },
                Err(e) => FinalizationOutcome::Degraded { reason: e.to_string() },
            },
            Err(e) => FinalizationOutcome::Degraded { reason: e.to_string() },
        };

        let metadata = match &outcome {
            FinalizationOutcome::Finalized { artifact } => json!({
                "signed_count": order.signed_count,
                "total_signers": order.total_signers,
                "final_file_path": artifact.path,
                "final_file_hash": artifact.hash,
            }),
            FinalizationOutcome::Degraded { reason } => json!({
                "signed_count": order.signed_count,
                "total_signers": order.total_signers,
                "assembly_error": reason,
            }),
            _ => serde_json::Value::Null,
        };
        append_audit(
            self.audit.as_ref(),
            AuditEntry::new(
                order.id,
                None,
                AuditEventType::Completed,
                format!("Ordem {} assinada por todos os signatários", order.os_number),
            )
            .with_metadata(metadata),
        )
        .await;

        match &outcome {
            FinalizationOutcome::Finalized { artifact } => {
                info!(os_id = %order.id, final_file_hash = %artifact.hash, "order finalized");
                self.notify_finalized(order, artifact, &mut warnings).await;
            }
            FinalizationOutcome::Degraded { reason } => {
                warn!(os_id = %order.id, reason = %reason, "order completed without final artifact");
                warnings.push(format!(
                    "signatures recorded, consolidated document delayed: {}",
                    reason
                ));
            }
            _ => {}
        }

        FinalizationReport { outcome, warnings }
    }

    /// Download the original, assemble in memory, then upload to the final
    /// path with overwrite.
    async fn produce_artifact(&self, order: &Order) -> OsignResult<FinalArtifact> {
        let original = self
            .blobs
            .download(&order.file_path)
            .await
            .map_err(assembly_failed)?
            .ok_or_else(|| OsignError::AssemblyFailed {
                reason: format!("original document missing at '{}'", order.file_path),
            })?;
        let signers = self.store.signers(order.id).await.map_err(assembly_failed)?;

        let assembled = assemble(
            order,
            &signers,
            &original,
            self.renderer.as_ref(),
            &self.assembly,
            &self.storage,
        )?;

        self.blobs
            .upload(&assembled.artifact.path, assembled.bytes)
            .await
            .map_err(assembly_failed)?;
        Ok(assembled.artifact)
    }

    async fn notify_finalized(&self, order: &Order, artifact: &FinalArtifact, warnings: &mut Vec<String>) {
        let ttl = Duration::from_secs(self.storage.signed_url_ttl_secs);
        let url = match self.blobs.signed_url(&artifact.path, ttl).await {
            Ok(url) => url,
            Err(e) => {
                warn!(os_id = %order.id, error = %e, "no download link for finalized notice");
                None
            }
        };

        let signers = match self.store.signers(order.id).await {
            Ok(signers) => signers,
            Err(e) => {
                warnings.push(format!("finalized notices not sent: {}", e));
                return;
            }
        };

        for signer in signers.iter().filter(|s| s.status == SignerStatus::Signed) {
            match self.gateway.finalized(order, signer, url.as_deref()).await {
                Ok(()) => {
                    append_audit(
                        self.audit.as_ref(),
                        AuditEntry::new(
                            order.id,
                            Some(signer.id),
                            AuditEventType::EmailSentFinalized,
                            format!("Documento final enviado para {}", signer.email),
                        ),
                    )
                    .await;
                }
                Err(e) => warnings.push(format!("finalized notice to {} failed: {}", signer.email, e)),
            }
        }
    }

    /// Operator-triggered recovery.
    ///
    /// - `Completed`: rebuild the artifact at the same path and attach it;
    ///   finalized notices go out only if no artifact was attached before.
    /// - all signed but unclaimed: run the normal claim.
    /// - anything else: `InvalidTransition`.
    pub async fn reprocess(&self, os_id: OrderId) -> OsignResult<FinalizationReport> {
        let order = self
            .store
            .order(os_id)
            .await?
            .ok_or_else(|| OsignError::order_not_found(os_id))?;

        if order.status == OrderStatus::Completed {
            let first_attach = order.final_artifact().is_none();
            let artifact = self.produce_artifact(&order).await?;
            self.store.attach_final_artifact(os_id, &artifact).await?;
            info!(os_id = %os_id, final_file_hash = %artifact.hash, "final artifact reprocessed");

            let mut warnings = Vec::new();
            if first_attach {
                self.notify_finalized(&order, &artifact, &mut warnings).await;
            }
            return Ok(FinalizationReport {
                outcome: FinalizationOutcome::Finalized { artifact },
                warnings,
            });
        }

        if is_all_signed(&order) && is_open(order.status) {
            return self.check(os_id).await;
        }

        Err(OsignError::InvalidTransition {
            reason: format!(
                "order {} is {} with {} of {} signatures and cannot be finalized",
                order.os_number, order.status, order.signed_count, order.total_signers
            ),
        })
    }
}

fn assembly_failed(e: OsignError) -> OsignError {
    match e {
        OsignError::AssemblyFailed { .. } => e,
        other => OsignError::AssemblyFailed { reason: other.to_string() },
    }
}
