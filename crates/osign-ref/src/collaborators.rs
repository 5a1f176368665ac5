//! Stand-ins for the external collaborators: email delivery and IP lookup.
//!
//! Nothing here leaves the process. The notifier records every message so
//! scenarios can count what was sent.

use std::{
    collections::HashSet,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use osign_contracts::error::{OsignError, OsignResult};
use osign_core::traits::{EmailMessage, IpLookup, Notifier};

// ── Notifier ─────────────────────────────────────────────────────────────────

/// Records every delivered message; refuses recipients marked as failing.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make delivery to `email` fail from now on.
    pub fn fail_for(&self, email: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(email.to_lowercase());
        }
    }

    /// Every message delivered so far, in order.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages delivered to `email` whose subject starts with `subject`.
    pub fn count(&self, email: &str, subject: &str) -> usize {
        self.sent()
            .iter()
            .filter(|m| m.to_email == email && m.subject.starts_with(subject))
            .count()
    }

    /// Messages delivered with a subject starting with `subject`.
    pub fn count_subject(&self, subject: &str) -> usize {
        self.sent().iter().filter(|m| m.subject.starts_with(subject)).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> OsignResult<()> {
        let refused = self
            .failing
            .lock()
            .map(|f| f.contains(&message.to_email.to_lowercase()))
            .unwrap_or(false);
        if refused {
            return Err(OsignError::Notification {
                reason: format!("mailbox {} rejected the message", message.to_email),
            });
        }
        let mut sent = self.sent.lock().map_err(|e| OsignError::Internal {
            reason: format!("notifier lock poisoned: {}", e),
        })?;
        sent.push(message.clone());
        Ok(())
    }
}

// ── IP lookup ────────────────────────────────────────────────────────────────

/// Answers with a fixed address, or fails when built with `None`.
pub struct StaticIpLookup(pub Option<String>);

impl StaticIpLookup {
    pub fn new(ip: &str) -> Self {
        Self(Some(ip.to_string()))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IpLookup for StaticIpLookup {
    async fn public_ip(&self) -> OsignResult<String> {
        self.0.clone().ok_or_else(|| OsignError::Internal {
            reason: "IP lookup service unreachable".to_string(),
        })
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledIpLookup(pub Duration);

#[async_trait]
impl IpLookup for StalledIpLookup {
    async fn public_ip(&self) -> OsignResult<String> {
        tokio::time::sleep(self.0).await;
        Ok("198.51.100.99".to_string())
    }
}
