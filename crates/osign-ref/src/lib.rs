//! # osign-ref
//!
//! Reference runtime for the OSIGN service-order signing engine.
//!
//! Wires the real engine (lifecycle rules, finalization coordinator,
//! assembly, notification gateway) to in-process backends and demonstrates
//! four scenarios with fictional data:
//!
//! A. **Sequential completion**: two signers sign one after the other.
//! B. **Simultaneous completion**: both signers sign at once; exactly one
//!    call finalizes.
//! C. **Cancellation**: a partially signed order is cancelled, rejects a
//!    late signature, and is deleted.
//! D. **Completion by removal**: removing the last pending signer
//!    finalizes the order.
//!
//! No external services are contacted.

pub mod collaborators;
pub mod invariants;
pub mod mock_data;
pub mod runtime;
pub mod scenarios;

pub use runtime::ReferenceRuntime;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::Utc;

    use osign_config::EngineConfig;
    use osign_contracts::{
        audit::AuditEventType,
        error::OsignError,
        order::{Order, OrderStatus},
        outcome::FinalizationOutcome,
        signer::{SignatureData, Signer, SignerStatus, SignerTransition},
    };
    use osign_core::{
        integrity::signature_hash,
        traits::{BlobStore, OrderStore},
    };

    use crate::{
        collaborators::{StalledIpLookup, StaticIpLookup},
        invariants::violations,
        mock_data::{claim_for, desktop_device, sample_order, OWNER_ID, PEOPLE, SESSION_IP},
        runtime::ReferenceRuntime,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    async fn order_with(runtime: &ReferenceRuntime, signers: usize) -> (Order, Vec<Signer>) {
        let order = runtime
            .engine
            .create_order(sample_order("OS-TEST", signers))
            .await
            .unwrap();
        let signers = runtime.engine.order_snapshot(order.id).await.unwrap().signers;
        (order, signers)
    }

    async fn sign(runtime: &ReferenceRuntime, signers: &[Signer], i: usize) {
        runtime
            .engine
            .submit_signature(signers[i].id, claim_for(i), desktop_device())
            .await
            .unwrap();
    }

    async fn reload(runtime: &ReferenceRuntime, order: &Order) -> Order {
        runtime.engine.order_snapshot(order.id).await.unwrap().order
    }

    /// Commit every signature straight to the store, leaving the order
    /// all-signed but unclaimed, as after a failed finalization check.
    async fn sign_all_without_claim(runtime: &ReferenceRuntime, order: &Order, signers: &[Signer]) {
        for (i, signer) in signers.iter().enumerate() {
            let claim = claim_for(i);
            let data = SignatureData {
                full_name: claim.full_name,
                national_id: claim.national_id,
                birth_date: claim.birth_date,
                device: desktop_device(),
                ip_address: SESSION_IP.to_string(),
                signed_at: Utc::now(),
                document_hash: order.file_hash.clone(),
            };
            let hash = signature_hash(&order.id, &signer.id, &data).unwrap();
            runtime
                .store
                .apply_transition(&SignerTransition::Sign {
                    signer_id: signer.id,
                    data,
                    signature_hash: hash,
                })
                .await
                .unwrap();
        }
        let pending = reload(runtime, order).await;
        assert_eq!(pending.status, OrderStatus::PartialSigned);
        assert_eq!(pending.signed_count, pending.total_signers);
    }

    // ── Creation ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn created_order_is_pending_and_requests_signatures() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 3).await;

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_signers, 3);
        assert!(order.file_path.starts_with("orders/"));
        assert!(order.file_path.ends_with("/termo-entrega.pdf"));
        assert_eq!(signers.iter().map(|s| s.order_index).collect::<Vec<_>>(), vec![0, 1, 2]);

        let subject = &runtime.engine.config().notifications.request_subject;
        assert_eq!(runtime.notifier.count_subject(subject), 3);
        assert_eq!(runtime.audit.count(order.id, AuditEventType::EmailSent).unwrap(), 3);
    }

    #[tokio::test]
    async fn invalid_request_uploads_nothing() {
        let runtime = ReferenceRuntime::new();
        let mut request = sample_order("OS-DUP", 2);
        request.signers[1].email = request.signers[0].email.to_uppercase();

        let err = runtime.engine.create_order(request).await.unwrap_err();
        assert!(matches!(err, OsignError::InvalidRequest { .. }));
        assert!(runtime.blobs.paths().await.is_empty());
    }

    #[tokio::test]
    async fn failed_insert_removes_the_uploaded_original() {
        let runtime = ReferenceRuntime::new();
        runtime.store.set_unavailable(true);

        let err = runtime.engine.create_order(sample_order("OS-DOWN", 1)).await.unwrap_err();
        assert!(matches!(err, OsignError::Store { .. }));
        assert!(runtime.blobs.paths().await.is_empty());
    }

    #[tokio::test]
    async fn draft_orders_wait_for_publication() {
        let runtime = ReferenceRuntime::new();
        let mut request = sample_order("OS-DRAFT", 2);
        request.draft = true;
        let order = runtime.engine.create_order(request).await.unwrap();
        let signers = runtime.engine.order_snapshot(order.id).await.unwrap().signers;

        assert_eq!(order.status, OrderStatus::Draft);
        assert!(runtime.notifier.sent().is_empty());

        let err = runtime
            .engine
            .submit_signature(signers[0].id, claim_for(0), desktop_device())
            .await
            .unwrap_err();
        assert!(matches!(err, OsignError::OrderNotSignable { .. }));

        let err = runtime.engine.publish_order(order.id, "someone-else").await.unwrap_err();
        assert!(matches!(err, OsignError::Forbidden { .. }));

        let published = runtime.engine.publish_order(order.id, OWNER_ID).await.unwrap();
        assert_eq!(published.status, OrderStatus::Pending);
        assert_eq!(runtime.notifier.sent().len(), 2);

        let err = runtime.engine.publish_order(order.id, OWNER_ID).await.unwrap_err();
        assert!(matches!(err, OsignError::InvalidTransition { .. }));
    }

    // ── Signing ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn invalid_identity_changes_nothing() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 1).await;

        let mut one_name = claim_for(0);
        one_name.full_name = "Bruno".to_string();
        let mut repeated_digits = claim_for(0);
        repeated_digits.national_id = "111.111.111-11".to_string();

        for claim in [one_name, repeated_digits] {
            let err = runtime
                .engine
                .submit_signature(signers[0].id, claim, desktop_device())
                .await
                .unwrap_err();
            assert!(matches!(err, OsignError::InvalidIdentity { .. }));
        }

        let snapshot = runtime.engine.order_snapshot(order.id).await.unwrap();
        assert_eq!(snapshot.signers[0].status, SignerStatus::Pending);
        assert_eq!(snapshot.order.signed_count, 0);
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Signed).unwrap(), 0);
    }

    #[tokio::test]
    async fn terminal_signers_cannot_act_again() {
        let runtime = ReferenceRuntime::new();
        let (_, signers) = order_with(&runtime, 3).await;
        sign(&runtime, &signers, 0).await;
        runtime.engine.refuse_signature(signers[1].id, "Dados incorretos").await.unwrap();

        for (i, signer) in signers.iter().take(2).enumerate() {
            let err = runtime
                .engine
                .submit_signature(signer.id, claim_for(i), desktop_device())
                .await
                .unwrap_err();
            assert!(matches!(err, OsignError::AlreadyFinalized { .. }));
            let err = runtime.engine.refuse_signature(signer.id, "mudei de ideia").await.unwrap_err();
            assert!(matches!(err, OsignError::AlreadyFinalized { .. }));
        }
    }

    #[tokio::test]
    async fn refusal_never_completes_an_order() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        sign(&runtime, &signers, 0).await;

        let refused = runtime
            .engine
            .refuse_signature(signers[1].id, "Não reconheço o equipamento")
            .await
            .unwrap();
        assert_eq!(refused.status, SignerStatus::Refused);
        assert!(refused.refused_at.is_some());

        let order = reload(&runtime, &order).await;
        assert_eq!(order.status, OrderStatus::PartialSigned);
        assert_eq!(order.signed_count, 1);
        assert!(order.completed_at.is_none());
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Refused).unwrap(), 1);
    }

    #[tokio::test]
    async fn unreachable_ip_lookup_records_the_sentinel() {
        let runtime = ReferenceRuntime::with(
            EngineConfig::default(),
            Arc::new(StaticIpLookup::unavailable()),
        );
        let (_, signers) = order_with(&runtime, 2).await;

        let receipt = runtime
            .engine
            .submit_signature(signers[0].id, claim_for(0), desktop_device())
            .await
            .unwrap();
        assert_eq!(receipt.ip_address, "unavailable");
        assert_eq!(receipt.signed_count, 1);
        assert!(receipt.warnings.iter().any(|w| w.contains("IP lookup failed")));
    }

    #[tokio::test]
    async fn slow_ip_lookup_times_out_to_the_sentinel() {
        let mut config = EngineConfig::default();
        config.signing.ip_lookup_timeout_ms = 20;
        let runtime = ReferenceRuntime::with(
            config,
            Arc::new(StalledIpLookup(Duration::from_secs(5))),
        );
        let (_, signers) = order_with(&runtime, 1).await;

        let receipt = runtime
            .engine
            .submit_signature(signers[0].id, claim_for(0), desktop_device())
            .await
            .unwrap();
        assert_eq!(receipt.ip_address, "unavailable");
        assert!(receipt.warnings.iter().any(|w| w.contains("timed out")));
        assert!(matches!(receipt.finalization, FinalizationOutcome::Finalized { .. }));
    }

    #[tokio::test]
    async fn audit_outage_does_not_block_signing() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        runtime.audit.set_unavailable(true);

        let receipt = runtime
            .engine
            .submit_signature(signers[0].id, claim_for(0), desktop_device())
            .await
            .unwrap();
        assert!(receipt.warnings.iter().any(|w| w.contains("audit")));
        assert_eq!(reload(&runtime, &order).await.signed_count, 1);
    }

    #[tokio::test]
    async fn failed_finalized_notice_is_a_warning() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        runtime.notifier.fail_for(PEOPLE[1].1);

        sign(&runtime, &signers, 0).await;
        let receipt = runtime
            .engine
            .submit_signature(signers[1].id, claim_for(1), desktop_device())
            .await
            .unwrap();

        assert!(matches!(receipt.finalization, FinalizationOutcome::Finalized { .. }));
        assert!(receipt.warnings.iter().any(|w| w.contains(PEOPLE[1].1)));
        assert_eq!(reload(&runtime, &order).await.status, OrderStatus::Completed);
        assert_eq!(
            runtime.audit.count(order.id, AuditEventType::EmailSentFinalized).unwrap(),
            1
        );
    }

    // ── Degraded finalization ─────────────────────────────────────────────────

    #[tokio::test]
    async fn blob_outage_degrades_then_reprocessing_recovers() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 1).await;
        runtime.blobs.set_unavailable(true);

        let receipt = runtime
            .engine
            .submit_signature(signers[0].id, claim_for(0), desktop_device())
            .await
            .unwrap();
        assert!(matches!(receipt.finalization, FinalizationOutcome::Degraded { .. }));
        assert_eq!(receipt.order_status, OrderStatus::Completed);
        assert!(receipt.warnings.iter().any(|w| w.contains("consolidated document delayed")));

        let degraded = reload(&runtime, &order).await;
        assert_eq!(degraded.status, OrderStatus::Completed);
        assert!(!degraded.has_final_fields());
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Completed).unwrap(), 1);
        let finalized_subject = runtime.engine.config().notifications.finalized_subject.clone();
        assert_eq!(runtime.notifier.count_subject(&finalized_subject), 0);

        runtime.blobs.set_unavailable(false);
        assert_eq!(runtime.engine.final_artifact_url(order.id).await.unwrap(), None);

        let report = runtime.engine.reprocess_final_artifact(order.id).await.unwrap();
        assert!(matches!(report.outcome, FinalizationOutcome::Finalized { .. }));

        let recovered = runtime.engine.order_snapshot(order.id).await.unwrap();
        assert!(recovered.order.final_artifact().is_some());
        assert!(violations(&recovered).is_empty());
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Completed).unwrap(), 1);
        assert_eq!(runtime.notifier.count_subject(&finalized_subject), 1);
        assert!(runtime.engine.final_artifact_url(order.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn artifact_url_falls_back_to_the_derived_path() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 1).await;
        runtime.blobs.set_unavailable(true);
        sign(&runtime, &signers, 0).await;
        runtime.blobs.set_unavailable(false);

        let derived = format!("{}.final.pdf", order.file_path);
        runtime.blobs.upload(&derived, b"assembled elsewhere".to_vec()).await.unwrap();

        let url = runtime.engine.final_artifact_url(order.id).await.unwrap().unwrap();
        assert!(url.contains(&derived));
    }

    #[tokio::test]
    async fn reprocessing_claims_an_unclaimed_signed_order() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        sign_all_without_claim(&runtime, &order, &signers).await;

        let report = runtime.engine.reprocess_final_artifact(order.id).await.unwrap();
        assert!(matches!(report.outcome, FinalizationOutcome::Finalized { .. }));

        let snapshot = runtime.engine.order_snapshot(order.id).await.unwrap();
        assert_eq!(snapshot.order.status, OrderStatus::Completed);
        assert!(violations(&snapshot).is_empty());
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Completed).unwrap(), 1);
        let final_path = format!("{}.final.pdf", order.file_path);
        assert_eq!(runtime.blobs.upload_count(&final_path).await, 1);
    }

    #[tokio::test]
    async fn unfinished_orders_cannot_be_reprocessed() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        sign(&runtime, &signers, 0).await;

        let err = runtime.engine.reprocess_final_artifact(order.id).await.unwrap_err();
        assert!(matches!(err, OsignError::InvalidTransition { .. }));
        assert!(!reload(&runtime, &order).await.has_final_fields());
    }

    // ── Reminders and expiry ──────────────────────────────────────────────────

    #[tokio::test]
    async fn reminders_go_to_pending_signers_only() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        sign(&runtime, &signers, 0).await;

        runtime.engine.send_reminder(order.id, signers[1].id).await.unwrap();
        let err = runtime.engine.send_reminder(order.id, signers[0].id).await.unwrap_err();
        assert!(matches!(err, OsignError::AlreadyFinalized { .. }));

        let snapshot = runtime.engine.order_snapshot(order.id).await.unwrap();
        assert!(snapshot.signers[1].last_reminder_sent_at.is_some());
        assert_eq!(runtime.audit.count(order.id, AuditEventType::ReminderSent).unwrap(), 1);
        let subject = &runtime.engine.config().notifications.reminder_subject;
        assert_eq!(runtime.notifier.count(PEOPLE[1].1, subject), 1);
    }

    #[tokio::test]
    async fn past_deadline_rejects_signatures_and_sweep_expires() {
        let runtime = ReferenceRuntime::new();
        let mut request = sample_order("OS-SHORT", 2);
        request.expires_at = Utc::now() + chrono::Duration::milliseconds(150);
        let order = runtime.engine.create_order(request).await.unwrap();
        let signers = runtime.engine.order_snapshot(order.id).await.unwrap().signers;
        sign(&runtime, &signers, 0).await;

        tokio::time::sleep(Duration::from_millis(250)).await;

        let err = runtime
            .engine
            .submit_signature(signers[1].id, claim_for(1), desktop_device())
            .await
            .unwrap_err();
        assert!(matches!(err, OsignError::OrderNotSignable { .. }));

        let expired = runtime.engine.sweep_expired(Utc::now()).await.unwrap();
        assert_eq!(expired, vec![order.id]);
        assert!(runtime.engine.sweep_expired(Utc::now()).await.unwrap().is_empty());

        let snapshot = runtime.engine.order_snapshot(order.id).await.unwrap();
        assert_eq!(snapshot.order.status, OrderStatus::Expired);
        assert_eq!(snapshot.signers[0].status, SignerStatus::Signed);
        assert_eq!(snapshot.signers[1].status, SignerStatus::Expired);
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Expired).unwrap(), 1);
        assert!(violations(&snapshot).is_empty());
    }

    // ── Owner operations ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn only_the_owner_administers_an_order() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;

        let err = runtime.engine.cancel_order(order.id, "intruder", None).await.unwrap_err();
        assert!(matches!(err, OsignError::Forbidden { .. }));
        let err = runtime.engine.remove_signer(signers[0].id, "intruder").await.unwrap_err();
        assert!(matches!(err, OsignError::Forbidden { .. }));

        runtime.engine.cancel_order(order.id, OWNER_ID, None).await.unwrap();
        let err = runtime.engine.delete_order(order.id, "intruder").await.unwrap_err();
        assert!(matches!(err, OsignError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn deletion_requires_a_cancelled_order() {
        let runtime = ReferenceRuntime::new();
        let (order, _) = order_with(&runtime, 2).await;

        let err = runtime.engine.delete_order(order.id, OWNER_ID).await.unwrap_err();
        assert!(matches!(err, OsignError::InvalidTransition { .. }));
        assert_eq!(reload(&runtime, &order).await.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn terminal_orders_cannot_be_cancelled() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 1).await;
        sign(&runtime, &signers, 0).await;

        let err = runtime.engine.cancel_order(order.id, OWNER_ID, None).await.unwrap_err();
        assert!(matches!(err, OsignError::InvalidTransition { .. }));
        assert_eq!(reload(&runtime, &order).await.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn cancelling_a_fully_signed_order_finalizes_it() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        sign_all_without_claim(&runtime, &order, &signers).await;

        let err = runtime.engine.cancel_order(order.id, OWNER_ID, Some("engano")).await.unwrap_err();
        assert!(matches!(err, OsignError::InvalidTransition { .. }));

        let snapshot = runtime.engine.order_snapshot(order.id).await.unwrap();
        assert_eq!(snapshot.order.status, OrderStatus::Completed);
        assert!(snapshot.order.final_artifact().is_some());
        assert!(violations(&snapshot).is_empty());
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Cancelled).unwrap(), 0);
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Completed).unwrap(), 1);
        let cancelled_subject = &runtime.engine.config().notifications.cancelled_subject;
        assert_eq!(runtime.notifier.count_subject(cancelled_subject), 0);
    }

    #[tokio::test]
    async fn sweep_finalizes_instead_of_expiring_a_fully_signed_order() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        sign_all_without_claim(&runtime, &order, &signers).await;

        let later = order.expires_at + chrono::Duration::minutes(1);
        assert!(runtime.engine.sweep_expired(later).await.unwrap().is_empty());

        let snapshot = runtime.engine.order_snapshot(order.id).await.unwrap();
        assert_eq!(snapshot.order.status, OrderStatus::Completed);
        assert!(snapshot.signers.iter().all(|s| s.status == SignerStatus::Signed));
        assert_eq!(runtime.audit.count(order.id, AuditEventType::Expired).unwrap(), 0);
    }

    #[tokio::test]
    async fn signed_signers_cannot_be_removed() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;
        sign(&runtime, &signers, 0).await;

        let err = runtime.engine.remove_signer(signers[0].id, OWNER_ID).await.unwrap_err();
        assert!(matches!(err, OsignError::InvalidTransition { .. }));
        assert_eq!(reload(&runtime, &order).await.total_signers, 2);
    }

    #[tokio::test]
    async fn removing_a_signer_from_an_unsigned_order_does_not_finalize() {
        let runtime = ReferenceRuntime::new();
        let (order, signers) = order_with(&runtime, 2).await;

        let report = runtime.engine.remove_signer(signers[1].id, OWNER_ID).await.unwrap();
        assert_eq!(report.finalization, FinalizationOutcome::NotReady);
        assert_eq!(report.order.status, OrderStatus::Pending);
        assert_eq!(report.order.total_signers, 1);
        assert_eq!(runtime.audit.count(order.id, AuditEventType::SignerRemoved).unwrap(), 1);
    }
}
