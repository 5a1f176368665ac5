//! Signer entity and signing-time evidence types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::order::OrderId;

/// Opaque identifier of a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignerId(pub uuid::Uuid);

impl SignerId {
    /// Create a new, unique signer ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SignerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-signer status. Every state other than `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerStatus {
    Pending,
    Signed,
    Refused,
    Expired,
}

impl SignerStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Refused => "refused",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SignerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser/device context reported by the signing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub user_agent: String,
    pub platform: Option<String>,
    pub language: Option<String>,
    /// IANA zone name, e.g. "America/Sao_Paulo".
    pub timezone: String,
    /// "WIDTHxHEIGHT", e.g. "1920x1080".
    pub screen_resolution: String,
}

/// The identity a signer asserts when signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub full_name: String,
    /// CPF, with or without punctuation.
    pub national_id: String,
    pub birth_date: NaiveDate,
}

/// The structured evidence record captured on transition to `Signed`.
///
/// Owned by exactly one signer. Its canonical JSON encoding is the input of
/// that signer's `signature_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureData {
    pub full_name: String,
    /// Normalized 11-digit national id.
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub device: DeviceContext,
    pub ip_address: String,
    pub signed_at: DateTime<Utc>,
    /// The order's `file_hash` in force when the signature was given.
    pub document_hash: String,
}

/// A signer as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signer {
    pub id: SignerId,
    pub os_id: OrderId,
    /// Display order only; signers act in parallel.
    pub order_index: u32,
    pub name: String,
    pub email: String,
    /// Free-form label such as "Colaborador", "Gestor" or "Testemunha".
    pub role: String,
    pub status: SignerStatus,

    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub signature_hash: Option<String>,
    pub signature_data: Option<SignatureData>,

    pub refused_at: Option<DateTime<Utc>>,
    pub refusal_reason: Option<String>,

    pub last_reminder_sent_at: Option<DateTime<Utc>>,
}

impl Signer {
    /// A fresh `Pending` signer belonging to `os_id`.
    pub fn pending(os_id: OrderId, order_index: u32, new: &NewSigner) -> Self {
        Self {
            id: SignerId::new(),
            os_id,
            order_index,
            name: new.name.trim().to_string(),
            email: new.email.trim().to_lowercase(),
            role: new.role.trim().to_string(),
            status: SignerStatus::Pending,
            signed_at: None,
            ip_address: None,
            user_agent: None,
            signature_hash: None,
            signature_data: None,
            refused_at: None,
            refusal_reason: None,
            last_reminder_sent_at: None,
        }
    }
}

/// Signer fields supplied by the order creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSigner {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// A terminal transition to apply to one `Pending` signer.
///
/// The store applies it and the order counter recompute as one unit.
#[derive(Debug, Clone)]
pub enum SignerTransition {
    Sign {
        signer_id: SignerId,
        data: SignatureData,
        signature_hash: String,
    },
    Refuse {
        signer_id: SignerId,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl SignerTransition {
    pub fn signer_id(&self) -> SignerId {
        match self {
            Self::Sign { signer_id, .. } | Self::Refuse { signer_id, .. } => *signer_id,
        }
    }
}
