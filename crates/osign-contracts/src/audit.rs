//! Audit event types.
//!
//! Audit entries are append-only. They are never mutated, and are removed
//! only when their whole order is erased.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{order::OrderId, signer::SignerId};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Created,
    Signed,
    Refused,
    SignerRemoved,
    ReminderSent,
    Cancelled,
    Expired,
    Completed,
    EmailSent,
    EmailSentCancelled,
    EmailSentFinalized,
}

impl AuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Signed => "signed",
            Self::Refused => "refused",
            Self::SignerRemoved => "signer_removed",
            Self::ReminderSent => "reminder_sent",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Completed => "completed",
            Self::EmailSent => "email_sent",
            Self::EmailSentCancelled => "email_sent_cancelled",
            Self::EmailSentFinalized => "email_sent_finalized",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record, correlated to an order and optionally a signer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub os_id: OrderId,
    pub signer_id: Option<SignerId>,
    pub event_type: AuditEventType,
    /// Human-readable text shown in the order history.
    pub event_description: String,
    /// Structured context. Sensitive values are redacted by the sink.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// An entry stamped with the current time and empty metadata.
    pub fn new(
        os_id: OrderId,
        signer_id: Option<SignerId>,
        event_type: AuditEventType,
        event_description: impl Into<String>,
    ) -> Self {
        Self {
            os_id,
            signer_id,
            event_type,
            event_description: event_description.into(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Attach structured metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
