//! In-memory `OrderStore`.
//!
//! One `tokio::sync::Mutex` guards both tables, so every method is a
//! serializable transaction: a signer write and the recompute of its order
//! commit together, and conditional updates compare and set under the same
//! lock.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use osign_contracts::{
    error::{OsignError, OsignResult},
    order::{FinalArtifact, Order, OrderId, OrderStatus},
    signer::{Signer, SignerId, SignerStatus, SignerTransition},
};
use osign_core::{
    lifecycle::{ensure_pending, ensure_signable, is_all_signed, is_open, recompute},
    traits::OrderStore,
};

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    signers: HashMap<SignerId, Signer>,
}

impl Tables {
    fn signers_of(&self, os_id: OrderId) -> Vec<Signer> {
        let mut rows: Vec<Signer> = self
            .signers
            .values()
            .filter(|s| s.os_id == os_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.order_index);
        rows
    }

    fn order_mut(&mut self, os_id: OrderId) -> OsignResult<&mut Order> {
        self.orders
            .get_mut(&os_id)
            .ok_or_else(|| OsignError::order_not_found(os_id))
    }

    /// Recount one order from its signer rows and return the result.
    fn recompute(&mut self, os_id: OrderId) -> OsignResult<Order> {
        let rows = self.signers_of(os_id);
        let order = self.order_mut(os_id)?;
        recompute(order, &rows);
        Ok(order.clone())
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `Store`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> OsignResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OsignError::Store {
                reason: "order store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, order: &Order, signers: &[Signer]) -> OsignResult<()> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        if tables.orders.contains_key(&order.id) {
            return Err(OsignError::Store {
                reason: format!("order {} already exists", order.id),
            });
        }
        if let Some(stray) = signers.iter().find(|s| s.os_id != order.id) {
            return Err(OsignError::Store {
                reason: format!("signer {} belongs to another order", stray.id),
            });
        }
        tables.orders.insert(order.id, order.clone());
        for signer in signers {
            tables.signers.insert(signer.id, signer.clone());
        }
        tables.recompute(order.id)?;
        Ok(())
    }

    async fn order(&self, os_id: OrderId) -> OsignResult<Option<Order>> {
        self.check_available()?;
        Ok(self.tables.lock().await.orders.get(&os_id).cloned())
    }

    async fn signer(&self, signer_id: SignerId) -> OsignResult<Option<Signer>> {
        self.check_available()?;
        Ok(self.tables.lock().await.signers.get(&signer_id).cloned())
    }

    async fn signers(&self, os_id: OrderId) -> OsignResult<Vec<Signer>> {
        self.check_available()?;
        Ok(self.tables.lock().await.signers_of(os_id))
    }

    async fn apply_transition(&self, transition: &SignerTransition) -> OsignResult<Order> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let signer_id = transition.signer_id();

        let signer = tables
            .signers
            .get(&signer_id)
            .ok_or_else(|| OsignError::signer_not_found(signer_id))?;
        ensure_pending(signer)?;
        let os_id = signer.os_id;
        let order = tables
            .orders
            .get(&os_id)
            .ok_or_else(|| OsignError::order_not_found(os_id))?;
        ensure_signable(order)?;

        let signer = tables
            .signers
            .get_mut(&signer_id)
            .ok_or_else(|| OsignError::signer_not_found(signer_id))?;
        match transition {
            SignerTransition::Sign { data, signature_hash, .. } => {
                signer.status = SignerStatus::Signed;
                signer.signed_at = Some(data.signed_at);
                signer.ip_address = Some(data.ip_address.clone());
                signer.user_agent = Some(data.device.user_agent.clone());
                signer.signature_hash = Some(signature_hash.clone());
                signer.signature_data = Some(data.clone());
            }
            SignerTransition::Refuse { reason, at, .. } => {
                signer.status = SignerStatus::Refused;
                signer.refused_at = Some(*at);
                signer.refusal_reason = Some(reason.clone());
            }
        }

        let order = tables.recompute(os_id)?;
        debug!(
            os_id = %os_id,
            signer_id = %signer_id,
            signed_count = order.signed_count,
            total_signers = order.total_signers,
            "signer transition committed"
        );
        Ok(order)
    }

    async fn remove_signer(&self, signer_id: SignerId) -> OsignResult<Order> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let signer = tables
            .signers
            .get(&signer_id)
            .ok_or_else(|| OsignError::signer_not_found(signer_id))?;
        let os_id = signer.os_id;
        if signer.status != SignerStatus::Pending {
            return Err(OsignError::InvalidTransition {
                reason: format!("signer {} is {} and cannot be removed", signer_id, signer.status),
            });
        }
        let status = tables
            .orders
            .get(&os_id)
            .map(|o| o.status)
            .ok_or_else(|| OsignError::order_not_found(os_id))?;
        if matches!(status, OrderStatus::Cancelled | OrderStatus::Completed) {
            return Err(OsignError::InvalidTransition {
                reason: format!("signers of a {} order cannot be removed", status),
            });
        }

        tables.signers.remove(&signer_id);
        tables.recompute(os_id)
    }

    async fn update_status(
        &self,
        os_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> OsignResult<bool> {
        self.check_available()?;
        if next == OrderStatus::Completed {
            return Err(OsignError::InvalidTransition {
                reason: "completion goes through claim_completion".to_string(),
            });
        }
        let mut tables = self.tables.lock().await;
        let order = tables.order_mut(os_id)?;
        if order.status != expected {
            return Ok(false);
        }
        // A fully signed order is waiting for its claim and cannot be closed.
        if matches!(next, OrderStatus::Cancelled | OrderStatus::Expired) && is_all_signed(order) {
            return Ok(false);
        }
        order.status = next;
        tables.recompute(os_id)?;
        Ok(true)
    }

    async fn claim_completion(
        &self,
        os_id: OrderId,
        expected: OrderStatus,
        completed_at: DateTime<Utc>,
    ) -> OsignResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let order = tables.order_mut(os_id)?;
        if expected == OrderStatus::Completed
            || order.status != expected
            || !is_open(order.status)
            || !is_all_signed(order)
        {
            return Ok(false);
        }
        order.status = OrderStatus::Completed;
        order.completed_at = Some(completed_at);
        Ok(true)
    }

    async fn attach_final_artifact(
        &self,
        os_id: OrderId,
        artifact: &FinalArtifact,
    ) -> OsignResult<()> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let order = tables.order_mut(os_id)?;
        if order.status != OrderStatus::Completed {
            return Err(OsignError::InvalidTransition {
                reason: format!("final artifact cannot be attached to a {} order", order.status),
            });
        }
        order.final_file_path = Some(artifact.path.clone());
        order.final_file_name = Some(artifact.file_name.clone());
        order.final_file_hash = Some(artifact.hash.clone());
        Ok(())
    }

    async fn expire_order(&self, os_id: OrderId) -> OsignResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let order = tables.order_mut(os_id)?;
        if !is_open(order.status) || is_all_signed(order) {
            return Ok(false);
        }
        order.status = OrderStatus::Expired;
        for signer in tables.signers.values_mut() {
            if signer.os_id == os_id && signer.status == SignerStatus::Pending {
                signer.status = SignerStatus::Expired;
            }
        }
        tables.recompute(os_id)?;
        Ok(true)
    }

    async fn record_reminder(&self, signer_id: SignerId, at: DateTime<Utc>) -> OsignResult<()> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let signer = tables
            .signers
            .get_mut(&signer_id)
            .ok_or_else(|| OsignError::signer_not_found(signer_id))?;
        signer.last_reminder_sent_at = Some(at);
        Ok(())
    }

    async fn open_orders_expiring_by(&self, now: DateTime<Utc>) -> OsignResult<Vec<Order>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut due: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| is_open(o.status) && o.expires_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|o| o.expires_at);
        Ok(due)
    }

    async fn delete_signers(&self, os_id: OrderId) -> OsignResult<usize> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let before = tables.signers.len();
        tables.signers.retain(|_, s| s.os_id != os_id);
        Ok(before - tables.signers.len())
    }

    async fn delete_order(&self, os_id: OrderId) -> OsignResult<()> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        tables
            .orders
            .remove(&os_id)
            .map(|_| ())
            .ok_or_else(|| OsignError::order_not_found(os_id))
    }
}
