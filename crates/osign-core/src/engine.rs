//! The OSIGN signing engine: the operations facade over the lifecycle rules,
//! the finalization coordinator and the collaborators.
//!
//! Every signer-facing operation follows the same pipeline:
//!
//!   Validate → Load → Lifecycle check → Commit (store transaction) → Audit
//!            → Finalization check → Notify
//!
//! Nothing is written before validation and the lifecycle checks pass. Once
//! the store transaction commits, the operation succeeds: audit, finalization
//! and notification failures after that point become warnings, never errors.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use osign_config::EngineConfig;
use osign_contracts::{
    audit::{AuditEntry, AuditEventType},
    error::{OsignError, OsignResult},
    order::{NewOrder, Order, OrderId, OrderStatus},
    outcome::{
        DeletionReport, DocumentMatch, DocumentVerification, FinalizationOutcome, OrderSnapshot,
        RemovalReport, SignatureReceipt,
    },
    signer::{DeviceContext, IdentityClaim, SignatureData, Signer, SignerId, SignerStatus, SignerTransition},
};

use crate::{
    assembly::final_artifact_path,
    finalize::{FinalizationCoordinator, FinalizationReport},
    identity::validate_identity,
    integrity::{hash_bytes, signature_hash},
    lifecycle::{
        cancellation_recipients, ensure_cancellable, ensure_deletable, ensure_owner, ensure_pending,
        ensure_removable, ensure_signable, is_all_signed, is_open,
    },
    notify::NotificationGateway,
    record::append_audit,
    traits::{AuditSink, BlobStore, DocumentRenderer, IpLookup, Notifier, OrderStore},
};

/// The signing engine.
///
/// Holds shared handles to its collaborators and can be cloned cheaply into
/// concurrent tasks; every clone talks to the same store.
#[derive(Clone)]
pub struct SigningEngine {
    store: Arc<dyn OrderStore>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditSink>,
    ip_lookup: Arc<dyn IpLookup>,
    gateway: Arc<NotificationGateway>,
    coordinator: Arc<FinalizationCoordinator>,
    config: Arc<EngineConfig>,
}

impl SigningEngine {
    /// Create an engine over the given collaborators and configuration.
    pub fn new(
        store: Arc<dyn OrderStore>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
        ip_lookup: Arc<dyn IpLookup>,
        renderer: Arc<dyn DocumentRenderer>,
        config: EngineConfig,
    ) -> Self {
        let gateway = Arc::new(NotificationGateway::new(notifier, config.notifications.clone()));
        let coordinator = Arc::new(FinalizationCoordinator::new(
            store.clone(),
            blobs.clone(),
            audit.clone(),
            gateway.clone(),
            renderer,
            config.assembly.clone(),
            config.storage.clone(),
        ));
        Self {
            store,
            blobs,
            audit,
            ip_lookup,
            gateway,
            coordinator,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Order creation ───────────────────────────────────────────────────────

    /// Open a new order: upload the original, insert order and signers, and
    /// (unless drafting) ask every signer to sign.
    pub async fn create_order(&self, request: NewOrder) -> OsignResult<Order> {
        let now = Utc::now();
        validate_new_order(&request, now)?;

        let os_id = OrderId::new();
        let file_name = request.file_name.trim().to_string();
        let file_path = format!("{}/{}/{}", self.config.storage.order_prefix, os_id, file_name);
        let file_hash = hash_bytes(&request.file_bytes);
        let file_size = request.file_bytes.len() as u64;

        let signers: Vec<Signer> = request
            .signers
            .iter()
            .enumerate()
            .map(|(i, s)| Signer::pending(os_id, i as u32, s))
            .collect();

        let order = Order {
            id: os_id,
            os_number: request.os_number.trim().to_string(),
            title: request.title.trim().to_string(),
            description: request.description.clone(),
            file_path: file_path.clone(),
            file_name,
            file_size,
            file_hash,
            final_file_path: None,
            final_file_name: None,
            final_file_hash: None,
            total_signers: signers.len() as u32,
            signed_count: 0,
            status: if request.draft { OrderStatus::Draft } else { OrderStatus::Pending },
            created_at: now,
            expires_at: request.expires_at,
            completed_at: None,
            created_by: request.created_by.clone(),
            created_by_name: request.created_by_name.clone(),
        };

        self.blobs.upload(&file_path, request.file_bytes).await?;

        if let Err(e) = self.store.insert_order(&order, &signers).await {
            if let Err(cleanup) = self.blobs.remove(&file_path).await {
                warn!(os_id = %os_id, error = %cleanup, "orphaned original not removed");
            }
            return Err(e);
        }

        info!(
            os_id = %os_id,
            os_number = %order.os_number,
            status = %order.status,
            total_signers = order.total_signers,
            "order created"
        );

        append_audit(
            self.audit.as_ref(),
            AuditEntry::new(
                os_id,
                None,
                AuditEventType::Created,
                format!("Ordem {} criada por {}", order.os_number, order.created_by_name),
            )
            .with_metadata(json!({
                "file_name": order.file_name,
                "file_size": order.file_size,
                "file_hash": order.file_hash,
                "total_signers": order.total_signers,
                "expires_at": order.expires_at,
            })),
        )
        .await;

        if !request.draft {
            let warnings = self.send_requests(&order, &signers).await;
            for w in &warnings {
                debug!(os_id = %os_id, warning = %w, "signature request degraded");
            }
        }

        Ok(order)
    }

    /// Move a `Draft` order to `Pending` and send the signature requests.
    pub async fn publish_order(&self, os_id: OrderId, actor_id: &str) -> OsignResult<Order> {
        let order = self.load_order(os_id).await?;
        ensure_owner(&order, actor_id)?;
        if order.status != OrderStatus::Draft {
            return Err(OsignError::InvalidTransition {
                reason: format!("only draft orders can be published (order is {})", order.status),
            });
        }
        if !self.store.update_status(os_id, OrderStatus::Draft, OrderStatus::Pending).await? {
            return Err(OsignError::InvalidTransition {
                reason: format!("order {} changed while publishing", order.os_number),
            });
        }
        info!(os_id = %os_id, status = %OrderStatus::Pending, "order published");

        let published = self.load_order(os_id).await?;
        let signers = self.store.signers(os_id).await?;
        self.send_requests(&published, &signers).await;
        Ok(published)
    }

    async fn send_requests(&self, order: &Order, signers: &[Signer]) -> Vec<String> {
        let mut warnings = Vec::new();
        for signer in signers.iter().filter(|s| s.status == SignerStatus::Pending) {
            match self.gateway.request_signature(order, signer).await {
                Ok(()) => {
                    append_audit(
                        self.audit.as_ref(),
                        AuditEntry::new(
                            order.id,
                            Some(signer.id),
                            AuditEventType::EmailSent,
                            format!("Solicitação de assinatura enviada para {}", signer.email),
                        ),
                    )
                    .await;
                }
                Err(e) => warnings.push(format!("signature request to {} failed: {}", signer.email, e)),
            }
        }
        warnings
    }

    // ── Signing ──────────────────────────────────────────────────────────────

    /// Capture one signature.
    ///
    /// # Pipeline
    ///
    /// 1. Validate the identity claim (nothing is read or written on failure)
    /// 2. Load signer and order; require `Pending` signer and signable order
    /// 3. Best-effort IP lookup, bounded by `ip_lookup_timeout_ms`
    /// 4. Build the evidence record and its `signature_hash`
    /// 5. Commit the transition and counter recompute atomically
    /// 6. Audit `signed`, then run the finalization check
    ///
    /// # Errors
    ///
    /// `InvalidIdentity`, `NotFound`, `AlreadyFinalized`, `OrderNotSignable`,
    /// or a store error from the commit itself. Anything failing after step 5
    /// is reported in `SignatureReceipt::warnings`.
    pub async fn submit_signature(
        &self,
        signer_id: SignerId,
        claim: IdentityClaim,
        device: DeviceContext,
    ) -> OsignResult<SignatureReceipt> {
        // ── Step 1: Validate the claim ───────────────────────────────────────
        let now = Utc::now();
        let identity = validate_identity(&claim, now.date_naive(), self.config.signing.min_birth_year)?;

        // ── Step 2: Lifecycle checks ─────────────────────────────────────────
        let signer = self.load_signer(signer_id).await?;
        ensure_pending(&signer)?;
        let order = self.load_order(signer.os_id).await?;
        ensure_signable(&order)?;
        if order.expires_at <= now {
            return Err(OsignError::OrderNotSignable {
                os_id: order.id.to_string(),
                status: format!("{} past deadline {}", order.status, order.expires_at.to_rfc3339()),
            });
        }

        // ── Step 3: IP enrichment ────────────────────────────────────────────
        let mut warnings = Vec::new();
        let ip_address = self.lookup_ip(&mut warnings).await;

        // ── Step 4: Evidence ─────────────────────────────────────────────────
        let evidence = SignatureData {
            full_name: identity.full_name,
            national_id: identity.national_id,
            birth_date: identity.birth_date,
            device,
            ip_address,
            signed_at: now,
            document_hash: order.file_hash.clone(),
        };
        let hash = signature_hash(&order.id, &signer.id, &evidence)?;

        // ── Step 5: Commit ───────────────────────────────────────────────────
        //
        // The store re-checks both preconditions inside the transaction, so a
        // concurrent signer or cancellation between step 2 and here is caught.
        let committed = self
            .store
            .apply_transition(&SignerTransition::Sign {
                signer_id,
                data: evidence.clone(),
                signature_hash: hash.clone(),
            })
            .await?;

        info!(
            os_id = %committed.id,
            signer_id = %signer_id,
            status = %committed.status,
            signed_count = committed.signed_count,
            total_signers = committed.total_signers,
            "signature recorded"
        );

        // ── Step 6: Audit and finalization ───────────────────────────────────
        let recorded = append_audit(
            self.audit.as_ref(),
            AuditEntry::new(
                committed.id,
                Some(signer_id),
                AuditEventType::Signed,
                format!("{} assinou a ordem {}", evidence.full_name, committed.os_number),
            )
            .with_metadata(json!({
                "national_id": evidence.national_id,
                "ip_address": evidence.ip_address,
                "user_agent": evidence.device.user_agent,
                "timezone": evidence.device.timezone,
                "screen_resolution": evidence.device.screen_resolution,
                "document_hash": evidence.document_hash,
                "signature_hash": hash,
            })),
        )
        .await;
        if !recorded {
            warnings.push("signature recorded but its audit event was not written".to_string());
        }

        let finalization = self.run_finalization(committed.id, &mut warnings).await;

        Ok(SignatureReceipt {
            os_id: committed.id,
            signer_id,
            signature_hash: hash,
            document_hash: evidence.document_hash,
            ip_address: evidence.ip_address,
            signed_at: now,
            order_status: if finalization.claimed() { OrderStatus::Completed } else { committed.status },
            signed_count: committed.signed_count,
            total_signers: committed.total_signers,
            finalization,
            warnings,
        })
    }

    /// Decline to sign. A refusal never completes an order.
    pub async fn refuse_signature(&self, signer_id: SignerId, reason: &str) -> OsignResult<Signer> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(OsignError::InvalidRequest {
                reason: "a refusal needs a reason".to_string(),
            });
        }

        let signer = self.load_signer(signer_id).await?;
        ensure_pending(&signer)?;
        let order = self.load_order(signer.os_id).await?;
        ensure_signable(&order)?;

        let committed = self
            .store
            .apply_transition(&SignerTransition::Refuse {
                signer_id,
                reason: reason.to_string(),
                at: Utc::now(),
            })
            .await?;

        info!(
            os_id = %committed.id,
            signer_id = %signer_id,
            status = %committed.status,
            "signature refused"
        );

        append_audit(
            self.audit.as_ref(),
            AuditEntry::new(
                committed.id,
                Some(signer_id),
                AuditEventType::Refused,
                format!("{} recusou a assinatura", signer.name),
            )
            .with_metadata(json!({ "reason": reason })),
        )
        .await;

        self.load_signer(signer_id).await
    }

    async fn lookup_ip(&self, warnings: &mut Vec<String>) -> String {
        let sentinel = &self.config.signing.ip_sentinel;
        let limit = Duration::from_millis(self.config.signing.ip_lookup_timeout_ms);
        match tokio::time::timeout(limit, self.ip_lookup.public_ip()).await {
            Ok(Ok(ip)) if !ip.trim().is_empty() => ip.trim().to_string(),
            Ok(Ok(_)) => {
                warnings.push(format!("IP lookup returned nothing, recorded '{}'", sentinel));
                sentinel.clone()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "IP lookup failed");
                warnings.push(format!("IP lookup failed, recorded '{}'", sentinel));
                sentinel.clone()
            }
            Err(_) => {
                warn!(timeout_ms = self.config.signing.ip_lookup_timeout_ms, "IP lookup timed out");
                warnings.push(format!("IP lookup timed out, recorded '{}'", sentinel));
                sentinel.clone()
            }
        }
    }

    async fn run_finalization(&self, os_id: OrderId, warnings: &mut Vec<String>) -> FinalizationOutcome {
        match self.coordinator.check(os_id).await {
            Ok(report) => {
                warnings.extend(report.warnings);
                report.outcome
            }
            Err(e) => {
                warn!(os_id = %os_id, error = %e, "finalization check failed");
                warnings.push(format!("finalization check failed: {}", e));
                FinalizationOutcome::NotReady
            }
        }
    }

    /// A fully signed order is never closed. Run the pending claim and
    /// describe why the requested transition did not happen.
    async fn finalize_instead(&self, order: &Order, attempted: &str) -> OsignError {
        let mut warnings = Vec::new();
        let outcome = self.run_finalization(order.id, &mut warnings).await;
        for w in &warnings {
            warn!(os_id = %order.id, warning = %w, "finalization degraded");
        }
        info!(
            os_id = %order.id,
            outcome = ?outcome,
            "order fully signed, finalizing instead of closing"
        );
        OsignError::InvalidTransition {
            reason: format!(
                "order {} has all {} signatures and cannot be {}; it was finalized instead",
                order.os_number, order.total_signers, attempted
            ),
        }
    }

    // ── Signer administration ────────────────────────────────────────────────

    /// Remove a `Pending` signer. May complete the order if every remaining
    /// signer has already signed.
    pub async fn remove_signer(&self, signer_id: SignerId, actor_id: &str) -> OsignResult<RemovalReport> {
        let signer = self.load_signer(signer_id).await?;
        let order = self.load_order(signer.os_id).await?;
        ensure_owner(&order, actor_id)?;
        ensure_removable(&order, &signer)?;

        let committed = self.store.remove_signer(signer_id).await?;
        info!(
            os_id = %committed.id,
            signer_id = %signer_id,
            signed_count = committed.signed_count,
            total_signers = committed.total_signers,
            "signer removed"
        );

        let mut warnings = Vec::new();
        let recorded = append_audit(
            self.audit.as_ref(),
            AuditEntry::new(
                committed.id,
                Some(signer_id),
                AuditEventType::SignerRemoved,
                format!("Signatário {} removido", signer.name),
            )
            .with_metadata(json!({
                "email": signer.email,
                "role": signer.role,
                "total_signers": committed.total_signers,
            })),
        )
        .await;
        if !recorded {
            warnings.push("signer removed but its audit event was not written".to_string());
        }

        let finalization = self.run_finalization(committed.id, &mut warnings).await;
        let order = self.load_order(committed.id).await?;
        Ok(RemovalReport { order, finalization, warnings })
    }

    /// Stamp and send a reminder to a signer who has not acted yet.
    pub async fn send_reminder(&self, os_id: OrderId, signer_id: SignerId) -> OsignResult<()> {
        let order = self.load_order(os_id).await?;
        let signer = self.load_signer(signer_id).await?;
        if signer.os_id != os_id {
            return Err(OsignError::signer_not_found(signer_id));
        }
        ensure_signable(&order)?;
        ensure_pending(&signer)?;

        self.gateway.remind(&order, &signer).await?;

        let at = Utc::now();
        self.store.record_reminder(signer_id, at).await?;
        info!(os_id = %os_id, signer_id = %signer_id, "reminder sent");

        append_audit(
            self.audit.as_ref(),
            AuditEntry::new(
                os_id,
                Some(signer_id),
                AuditEventType::ReminderSent,
                format!("Lembrete enviado para {}", signer.email),
            ),
        )
        .await;
        Ok(())
    }

    // ── Order administration ─────────────────────────────────────────────────

    /// Cancel a non-terminal order and notify its signers.
    pub async fn cancel_order(
        &self,
        os_id: OrderId,
        actor_id: &str,
        reason: Option<&str>,
    ) -> OsignResult<Order> {
        let order = self.load_order(os_id).await?;
        ensure_owner(&order, actor_id)?;
        ensure_cancellable(&order)?;
        if is_all_signed(&order) {
            return Err(self.finalize_instead(&order, "cancelled").await);
        }

        if !self.store.update_status(os_id, order.status, OrderStatus::Cancelled).await? {
            let current = self.load_order(os_id).await?;
            if is_all_signed(&current) && is_open(current.status) {
                return Err(self.finalize_instead(&current, "cancelled").await);
            }
            return Err(OsignError::InvalidTransition {
                reason: format!(
                    "order {} left {} before it could be cancelled",
                    order.os_number, order.status
                ),
            });
        }
        info!(os_id = %os_id, previous = %order.status, "order cancelled");

        append_audit(
            self.audit.as_ref(),
            AuditEntry::new(
                os_id,
                None,
                AuditEventType::Cancelled,
                format!("Ordem {} cancelada", order.os_number),
            )
            .with_metadata(json!({
                "reason": reason,
                "previous_status": order.status,
                "signed_count": order.signed_count,
            })),
        )
        .await;

        let cancelled = self.load_order(os_id).await?;
        let signers = self.store.signers(os_id).await?;
        for signer in cancellation_recipients(&signers) {
            match self.gateway.cancelled(&cancelled, signer, reason).await {
                Ok(()) => {
                    append_audit(
                        self.audit.as_ref(),
                        AuditEntry::new(
                            os_id,
                            Some(signer.id),
                            AuditEventType::EmailSentCancelled,
                            format!("Aviso de cancelamento enviado para {}", signer.email),
                        ),
                    )
                    .await;
                }
                Err(e) => warn!(os_id = %os_id, to = %signer.email, error = %e, "cancellation notice failed"),
            }
        }

        Ok(cancelled)
    }

    /// Expire one open order. Returns `false` if it was not open.
    pub async fn mark_expired(&self, os_id: OrderId) -> OsignResult<bool> {
        let order = self.load_order(os_id).await?;
        if !self.store.expire_order(os_id).await? {
            let current = self.load_order(os_id).await?;
            if is_all_signed(&current) && is_open(current.status) {
                let err = self.finalize_instead(&current, "expired").await;
                debug!(os_id = %os_id, reason = %err, "fully signed order not expired");
            } else {
                debug!(os_id = %os_id, status = %order.status, "order not open, nothing to expire");
            }
            return Ok(false);
        }
        info!(os_id = %os_id, signed_count = order.signed_count, "order expired");

        append_audit(
            self.audit.as_ref(),
            AuditEntry::new(
                os_id,
                None,
                AuditEventType::Expired,
                format!("Ordem {} expirou sem todas as assinaturas", order.os_number),
            )
            .with_metadata(json!({
                "expires_at": order.expires_at,
                "signed_count": order.signed_count,
                "total_signers": order.total_signers,
            })),
        )
        .await;
        Ok(true)
    }

    /// Expire every open order whose deadline is at or before `now`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> OsignResult<Vec<OrderId>> {
        let mut expired = Vec::new();
        for order in self.store.open_orders_expiring_by(now).await? {
            if self.mark_expired(order.id).await? {
                expired.push(order.id);
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "expiry sweep finished");
        }
        Ok(expired)
    }

    /// Delete a cancelled, incompletely signed order.
    ///
    /// Signers, audit trail and blobs are removed first, each best-effort;
    /// the order row goes last and is the only step whose failure is fatal.
    pub async fn delete_order(&self, os_id: OrderId, actor_id: &str) -> OsignResult<DeletionReport> {
        let order = self.load_order(os_id).await?;
        ensure_owner(&order, actor_id)?;
        ensure_deletable(&order)?;

        let mut report = DeletionReport::default();

        match self.store.delete_signers(os_id).await {
            Ok(n) => report.signers_removed = n,
            Err(e) => report.warnings.push(format!("signers not removed: {}", e)),
        }
        match self.audit.erase(os_id).await {
            Ok(n) => report.audit_events_removed = n,
            Err(e) => report.warnings.push(format!("audit trail not removed: {}", e)),
        }

        let mut paths = vec![order.file_path.clone()];
        if let Some(path) = &order.final_file_path {
            paths.push(path.clone());
        }
        let derived = final_artifact_path(&order.file_path, &self.config.storage);
        if !paths.contains(&derived) {
            paths.push(derived);
        }
        for path in paths {
            match self.blobs.remove(&path).await {
                Ok(true) => report.blobs_removed.push(path),
                Ok(false) => {}
                Err(e) => report.warnings.push(format!("blob '{}' not removed: {}", path, e)),
            }
        }

        self.store.delete_order(os_id).await?;

        for w in &report.warnings {
            warn!(os_id = %os_id, warning = %w, "order deletion cleanup incomplete");
        }
        info!(
            os_id = %os_id,
            signers_removed = report.signers_removed,
            audit_events_removed = report.audit_events_removed,
            "order deleted"
        );
        Ok(report)
    }

    // ── Final artifact ───────────────────────────────────────────────────────

    /// Operator recovery for a missing or stale final artifact.
    pub async fn reprocess_final_artifact(&self, os_id: OrderId) -> OsignResult<FinalizationReport> {
        self.coordinator.reprocess(os_id).await
    }

    /// A time-limited link to the final artifact, if one is stored.
    ///
    /// Probes the recorded path first, then the derived path for orders whose
    /// final fields were never attached.
    pub async fn final_artifact_url(&self, os_id: OrderId) -> OsignResult<Option<String>> {
        let order = self.load_order(os_id).await?;
        let ttl = Duration::from_secs(self.config.storage.signed_url_ttl_secs);

        let mut candidates = Vec::with_capacity(2);
        if let Some(path) = &order.final_file_path {
            candidates.push(path.clone());
        }
        let derived = final_artifact_path(&order.file_path, &self.config.storage);
        if !candidates.contains(&derived) {
            candidates.push(derived);
        }

        for path in candidates {
            if self.blobs.exists(&path).await? {
                return self.blobs.signed_url(&path, ttl).await;
            }
            debug!(os_id = %os_id, path = %path, "final artifact not at path");
        }
        Ok(None)
    }

    /// Hash `bytes` and compare against the order's recorded hashes.
    pub async fn verify_document(&self, os_id: OrderId, bytes: &[u8]) -> OsignResult<DocumentVerification> {
        let order = self.load_order(os_id).await?;
        let computed_hash = hash_bytes(bytes);
        let matched = if computed_hash == order.file_hash {
            DocumentMatch::Original
        } else if order.final_file_hash.as_deref() == Some(computed_hash.as_str()) {
            DocumentMatch::Final
        } else {
            DocumentMatch::None
        };
        Ok(DocumentVerification { os_id, computed_hash, matched })
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Order, signers and audit trail in one read.
    pub async fn order_snapshot(&self, os_id: OrderId) -> OsignResult<OrderSnapshot> {
        let order = self.load_order(os_id).await?;
        let mut signers = self.store.signers(os_id).await?;
        signers.sort_by_key(|s| s.order_index);
        let audit = self.audit.events_for(os_id).await?;
        Ok(OrderSnapshot { order, signers, audit })
    }

    async fn load_order(&self, os_id: OrderId) -> OsignResult<Order> {
        self.store
            .order(os_id)
            .await?
            .ok_or_else(|| OsignError::order_not_found(os_id))
    }

    async fn load_signer(&self, signer_id: SignerId) -> OsignResult<Signer> {
        self.store
            .signer(signer_id)
            .await?
            .ok_or_else(|| OsignError::signer_not_found(signer_id))
    }
}

/// Structural checks on a creation request.
pub fn validate_new_order(request: &NewOrder, now: DateTime<Utc>) -> OsignResult<()> {
    if request.title.trim().is_empty() {
        return Err(invalid("title is required"));
    }
    if request.os_number.trim().is_empty() {
        return Err(invalid("order number is required"));
    }
    if request.file_name.trim().is_empty() {
        return Err(invalid("file name is required"));
    }
    if request.file_bytes.is_empty() {
        return Err(invalid("document is empty"));
    }
    if request.created_by.trim().is_empty() {
        return Err(invalid("creator is required"));
    }
    if request.expires_at <= now {
        return Err(invalid("deadline must be in the future"));
    }
    if request.signers.is_empty() {
        return Err(invalid("at least one signer is required"));
    }

    let mut seen = HashSet::new();
    for (i, signer) in request.signers.iter().enumerate() {
        if signer.name.trim().is_empty() {
            return Err(invalid(&format!("signer {} has no name", i + 1)));
        }
        let email = signer.email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(invalid(&format!("signer {} has an invalid email '{}'", i + 1, signer.email)));
        }
        if !seen.insert(email) {
            return Err(invalid(&format!("signer email '{}' appears twice", signer.email.trim())));
        }
    }
    Ok(())
}

/// `local@domain` with both parts present and no whitespace.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn invalid(reason: &str) -> OsignError {
    OsignError::InvalidRequest { reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use osign_contracts::signer::NewSigner;

    use super::*;

    fn request() -> NewOrder {
        NewOrder {
            os_number: "OS-2024-0042".to_string(),
            title: "Termo de entrega".to_string(),
            description: None,
            file_name: "termo.pdf".to_string(),
            file_bytes: b"%PDF-1.4".to_vec(),
            expires_at: Utc::now() + Duration::days(7),
            created_by: "user-1".to_string(),
            created_by_name: "Ana Lima".to_string(),
            signers: vec![
                NewSigner {
                    name: "Bruno Costa".to_string(),
                    email: "bruno@example.com".to_string(),
                    role: "Colaborador".to_string(),
                },
                NewSigner {
                    name: "Carla Dias".to_string(),
                    email: "carla@example.com".to_string(),
                    role: "Gestor".to_string(),
                },
            ],
            draft: false,
        }
    }

    fn rejected(request: &NewOrder) -> String {
        match validate_new_order(request, Utc::now()) {
            Err(OsignError::InvalidRequest { reason }) => reason,
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    // ── Request validation ───────────────────────────────────────────────────

    #[test]
    fn well_formed_request_passes() {
        assert!(validate_new_order(&request(), Utc::now()).is_ok());
    }

    #[test]
    fn missing_title_or_document_is_rejected() {
        let mut r = request();
        r.title = "   ".to_string();
        assert!(rejected(&r).contains("title"));

        let mut r = request();
        r.file_bytes.clear();
        assert!(rejected(&r).contains("empty"));
    }

    #[test]
    fn order_without_signers_is_rejected() {
        let mut r = request();
        r.signers.clear();
        assert!(rejected(&r).contains("at least one signer"));
    }

    #[test]
    fn past_deadline_is_rejected() {
        let mut r = request();
        r.expires_at = Utc::now() - Duration::minutes(1);
        assert!(rejected(&r).contains("deadline"));
    }

    #[test]
    fn duplicate_emails_are_rejected_case_insensitively() {
        let mut r = request();
        r.signers[1].email = " BRUNO@example.com ".to_string();
        assert!(rejected(&r).contains("appears twice"));
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "bruno", "@example.com", "bruno@", "bru no@example.com", "a@b@c"] {
            let mut r = request();
            r.signers[0].email = bad.to_string();
            assert!(rejected(&r).contains("invalid email"), "accepted '{}'", bad);
        }
    }

    #[test]
    fn nameless_signer_is_rejected() {
        let mut r = request();
        r.signers[1].name = String::new();
        assert!(rejected(&r).contains("signer 2 has no name"));
    }
}
