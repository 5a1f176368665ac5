//! Error types for the OSIGN signing engine.
//!
//! All fallible engine operations return `OsignResult<T>`. Variants carry
//! enough context to produce a corrective user-facing message and an audit
//! entry without consulting the store again.

use thiserror::Error;

/// The unified error type for the OSIGN crates.
#[derive(Debug, Error)]
pub enum OsignError {
    /// The identity claim presented at signing time failed validation.
    ///
    /// Nothing is written when this is returned.
    #[error("invalid identity: {reason}")]
    InvalidIdentity { reason: String },

    /// A creation or administrative request is malformed.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The signer has already left `Pending` and cannot act again.
    #[error("signer {signer_id} is already finalized ({status})")]
    AlreadyFinalized { signer_id: String, status: String },

    /// The owning order does not accept signatures in its current status.
    #[error("order {os_id} is not signable ({status})")]
    OrderNotSignable { os_id: String, status: String },

    /// The actor is not allowed to perform the operation on this order.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// A lifecycle rule forbids the requested transition.
    #[error("invalid transition: {reason}")]
    InvalidTransition { reason: String },

    /// The referenced order or signer does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// The persistent store rejected or could not complete an operation.
    #[error("store error: {reason}")]
    Store { reason: String },

    /// The blob store rejected or could not complete an operation.
    #[error("blob store error: {reason}")]
    Blob { reason: String },

    /// The notifier could not deliver a message.
    #[error("notification failed: {reason}")]
    Notification { reason: String },

    /// The audit sink could not append an event.
    ///
    /// Non-fatal to the triggering operation; callers log and continue.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// Building or persisting the final artifact failed.
    #[error("document assembly failed: {reason}")]
    AssemblyFailed { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// A row vanished between read and write, or another invariant broke.
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl OsignError {
    /// Shorthand for a missing order.
    pub fn order_not_found(id: impl ToString) -> Self {
        Self::NotFound { entity: "order", id: id.to_string() }
    }

    /// Shorthand for a missing signer.
    pub fn signer_not_found(id: impl ToString) -> Self {
        Self::NotFound { entity: "signer", id: id.to_string() }
    }

    /// True for errors a user caused and can correct (validation and
    /// state conflicts), false for collaborator and internal failures.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentity { .. }
                | Self::InvalidRequest { .. }
                | Self::AlreadyFinalized { .. }
                | Self::OrderNotSignable { .. }
                | Self::Forbidden { .. }
                | Self::InvalidTransition { .. }
                | Self::NotFound { .. }
        )
    }
}

/// Convenience alias used throughout the OSIGN crates.
pub type OsignResult<T> = Result<T, OsignError>;
