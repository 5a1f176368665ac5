//! In-memory implementation of `AuditSink`.
//!
//! `InMemoryAuditTrail` is the reference implementation of the `AuditSink`
//! trait. It keeps one hash chain per order in a map protected by a `Mutex`,
//! so the engine's concurrent signing tasks can append to the same sink.
//!
//! Use `export_trail()` to obtain a sealed copy of one order's chain, and
//! `verify_integrity()` at any time to confirm that chain has not been
//! tampered with in memory.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use osign_contracts::{
    audit::{AuditEntry, AuditEventType},
    error::{OsignError, OsignResult},
    order::OrderId,
};
use osign_core::traits::AuditSink;

use crate::{
    chain::{hash_event, verify_chain},
    event::{AuditTrail, ChainedEvent},
    redact::redact_metadata,
};

// ── Internal mutable state ────────────────────────────────────────────────────

/// One order's chain.
#[derive(Default)]
pub(crate) struct Chain {
    /// All events appended so far, in append order. An event's `sequence`
    /// is its index here.
    pub(crate) events: Vec<ChainedEvent>,
}

impl Chain {
    /// The `this_hash` of the last event, or `GENESIS_HASH` for an empty
    /// chain, so the first event's `prev_hash` is automatically correct.
    fn head(&self) -> &str {
        self.events
            .last()
            .map(|e| e.this_hash.as_str())
            .unwrap_or(ChainedEvent::GENESIS_HASH)
    }
}

// ── Public sink ───────────────────────────────────────────────────────────────

/// An append-only audit sink backed by one SHA-256 hash chain per order.
///
/// Metadata is redacted before hashing, so the chain commits to exactly
/// what is stored.
///
/// # Thread safety
///
/// Every method acquires the internal `Mutex` once and releases it before
/// returning; the guard is never held across an `.await`. Appends to the
/// same order from different tasks are serialized by that lock, which keeps
/// sequence numbers gap-free.
#[derive(Default)]
pub struct InMemoryAuditTrail {
    pub(crate) chains: Mutex<HashMap<OrderId, Chain>>,

    /// Outage switch for tests of the best-effort audit path.
    unavailable: AtomicBool,
}

impl InMemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `append` fail with `AuditWriteFailed`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Export a sealed copy of one order's chain.
    ///
    /// `head_hash` is the `this_hash` of the last event, or an empty string
    /// when the order has no events.
    pub fn export_trail(&self, os_id: OrderId) -> OsignResult<AuditTrail> {
        let chains = self.lock()?;
        let events = chains.get(&os_id).map(|c| c.events.clone()).unwrap_or_default();
        let head_hash = events.last().map(|e| e.this_hash.clone()).unwrap_or_default();
        Ok(AuditTrail {
            os_id,
            events,
            exported_at: Utc::now(),
            head_hash,
        })
    }

    /// Re-verify the order's chain with `verify_chain`.
    ///
    /// An order with no chain (never audited, or erased) is intact.
    pub fn verify_integrity(&self, os_id: OrderId) -> OsignResult<bool> {
        let chains = self.lock()?;
        Ok(chains.get(&os_id).map_or(true, |c| verify_chain(&c.events)))
    }

    /// How many events of `event_type` the order has.
    pub fn count(&self, os_id: OrderId, event_type: AuditEventType) -> OsignResult<usize> {
        let chains = self.lock()?;
        Ok(chains.get(&os_id).map_or(0, |c| {
            c.events.iter().filter(|e| e.entry.event_type == event_type).count()
        }))
    }

    fn lock(&self) -> OsignResult<MutexGuard<'_, HashMap<OrderId, Chain>>> {
        self.chains.lock().map_err(|e| OsignError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }
}

// ── AuditSink impl ────────────────────────────────────────────────────────────

#[async_trait]
impl AuditSink for InMemoryAuditTrail {
    /// Redact, hash against the order's current head, then append.
    async fn append(&self, entry: &AuditEntry) -> OsignResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OsignError::AuditWriteFailed {
                reason: "audit sink unavailable".to_string(),
            });
        }

        let mut stored = entry.clone();
        stored.metadata = redact_metadata(&entry.metadata);

        let mut chains = self.lock()?;
        let chain = chains.entry(entry.os_id).or_default();
        let sequence = chain.events.len() as u64;
        let prev_hash = chain.head().to_string();
        let this_hash = hash_event(&entry.os_id, sequence, &stored, &prev_hash)?;

        debug!(
            os_id = %entry.os_id,
            sequence,
            event_type = %entry.event_type,
            "audit event appended"
        );

        chain.events.push(ChainedEvent {
            sequence,
            os_id: entry.os_id,
            entry: stored,
            prev_hash,
            this_hash,
        });
        Ok(())
    }

    async fn events_for(&self, os_id: OrderId) -> OsignResult<Vec<AuditEntry>> {
        let chains = self.lock()?;
        Ok(chains
            .get(&os_id)
            .map(|c| c.events.iter().map(|e| e.entry.clone()).collect())
            .unwrap_or_default())
    }

    async fn erase(&self, os_id: OrderId) -> OsignResult<usize> {
        let mut chains = self.lock()?;
        Ok(chains.remove(&os_id).map_or(0, |c| c.events.len()))
    }
}
