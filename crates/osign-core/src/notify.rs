//! Notification gateway: renders and dispatches the engine's emails.
//!
//! Templates come from `NotificationConfig`, passed in at construction.
//! Every interpolated value is HTML-escaped. Delivery failures are returned
//! to the caller, which logs them; they never roll back engine state.

use std::sync::Arc;

use tracing::{debug, warn};

use osign_config::NotificationConfig;
use osign_contracts::{
    error::OsignResult,
    order::Order,
    signer::Signer,
};

use crate::traits::{EmailMessage, Notifier};

/// The kinds of message the engine sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Request,
    Reminder,
    Cancelled,
    Finalized,
}

pub struct NotificationGateway {
    notifier: Arc<dyn Notifier>,
    config: NotificationConfig,
}

impl NotificationGateway {
    pub fn new(notifier: Arc<dyn Notifier>, config: NotificationConfig) -> Self {
        Self { notifier, config }
    }

    /// Ask `signer` to sign `order`.
    pub async fn request_signature(&self, order: &Order, signer: &Signer) -> OsignResult<()> {
        let message = self.compose(NoticeKind::Request, order, signer, None);
        self.dispatch(NoticeKind::Request, message).await
    }

    /// Remind a signer who has not signed yet.
    pub async fn remind(&self, order: &Order, signer: &Signer) -> OsignResult<()> {
        let message = self.compose(NoticeKind::Reminder, order, signer, None);
        self.dispatch(NoticeKind::Reminder, message).await
    }

    /// Tell a signer the order was cancelled.
    pub async fn cancelled(
        &self,
        order: &Order,
        signer: &Signer,
        reason: Option<&str>,
    ) -> OsignResult<()> {
        let message = self.compose(NoticeKind::Cancelled, order, signer, reason);
        self.dispatch(NoticeKind::Cancelled, message).await
    }

    /// Deliver the finalized document link to a signer.
    pub async fn finalized(
        &self,
        order: &Order,
        signer: &Signer,
        download_url: Option<&str>,
    ) -> OsignResult<()> {
        let message = self.compose(NoticeKind::Finalized, order, signer, download_url);
        self.dispatch(NoticeKind::Finalized, message).await
    }

    async fn dispatch(&self, kind: NoticeKind, message: EmailMessage) -> OsignResult<()> {
        debug!(kind = ?kind, to = %message.to_email, "sending notification");
        let result = self.notifier.send(&message).await;
        if let Err(e) = &result {
            warn!(kind = ?kind, to = %message.to_email, error = %e, "notification not delivered");
        }
        result
    }

    /// Render one message. `extra` is the cancellation reason or the
    /// download URL, depending on `kind`.
    pub fn compose(
        &self,
        kind: NoticeKind,
        order: &Order,
        signer: &Signer,
        extra: Option<&str>,
    ) -> EmailMessage {
        let cfg = &self.config;
        let name = escape_html(&signer.name);
        let title = escape_html(&order.title);
        let number = escape_html(&order.os_number);
        let creator = escape_html(&order.created_by_name);
        let sign_url = format!(
            "{}/sign/{}",
            cfg.app_base_url.trim_end_matches('/'),
            signer.id
        );

        let (subject, body) = match kind {
            NoticeKind::Request => (
                &cfg.request_subject,
                format!(
                    "<p>Olá, {name}.</p>\
                     <p>{creator} solicitou sua assinatura na ordem de serviço \
                     <strong>{number}</strong> ({title}), como {role}.</p>\
                     <p>Prazo: {deadline}.</p>\
                     <p><a href=\"{url}\">Assinar documento</a></p>",
                    role = escape_html(&signer.role),
                    deadline = order.expires_at.format("%d/%m/%Y"),
                    url = escape_html(&sign_url),
                ),
            ),
            NoticeKind::Reminder => (
                &cfg.reminder_subject,
                format!(
                    "<p>Olá, {name}.</p>\
                     <p>Sua assinatura na ordem de serviço <strong>{number}</strong> \
                     ({title}) ainda está pendente.</p>\
                     <p><a href=\"{url}\">Assinar documento</a></p>",
                    url = escape_html(&sign_url),
                ),
            ),
            NoticeKind::Cancelled => (
                &cfg.cancelled_subject,
                format!(
                    "<p>Olá, {name}.</p>\
                     <p>A ordem de serviço <strong>{number}</strong> ({title}) foi \
                     cancelada por {creator}.</p>{reason}",
                    reason = extra
                        .map(|r| format!("<p>Motivo: {}</p>", escape_html(r)))
                        .unwrap_or_default(),
                ),
            ),
            NoticeKind::Finalized => (
                &cfg.finalized_subject,
                format!(
                    "<p>Olá, {name}.</p>\
                     <p>A ordem de serviço <strong>{number}</strong> ({title}) foi \
                     assinada por todas as partes.</p>{link}",
                    link = extra
                        .map(|u| format!(
                            "<p><a href=\"{}\">Baixar documento assinado</a></p>",
                            escape_html(u)
                        ))
                        .unwrap_or_default(),
                ),
            ),
        };

        EmailMessage {
            to_email: signer.email.clone(),
            to_name: signer.name.clone(),
            subject: format!("{} - {}", subject, order.os_number),
            html_body: format!("{}<p>{}</p>", body, escape_html(&cfg.sender_name)),
        }
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use osign_contracts::{
        error::OsignError,
        order::{OrderId, OrderStatus},
        signer::NewSigner,
    };

    use super::*;

    /// Records every message; fails when `fail` is set.
    struct MockNotifier {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, message: &EmailMessage) -> OsignResult<()> {
            if self.fail {
                return Err(OsignError::Notification { reason: "smtp down".to_string() });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn fixtures() -> (Order, Signer) {
        let order = Order {
            id: OrderId::new(),
            os_number: "OS-7".to_string(),
            title: "Termo <confidencial>".to_string(),
            description: None,
            file_path: "orders/7/termo.pdf".to_string(),
            file_name: "termo.pdf".to_string(),
            file_size: 1,
            file_hash: "00".to_string(),
            final_file_path: None,
            final_file_name: None,
            final_file_hash: None,
            total_signers: 1,
            signed_count: 0,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::days(3),
            completed_at: None,
            created_by: "owner".to_string(),
            created_by_name: "Paula & Filhos".to_string(),
        };
        let signer = Signer::pending(
            order.id,
            0,
            &NewSigner {
                name: "João Pereira".to_string(),
                email: "joao@example.com".to_string(),
                role: "Gestor".to_string(),
            },
        );
        (order, signer)
    }

    #[test]
    fn escape_html_covers_special_characters() {
        assert_eq!(escape_html("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[tokio::test]
    async fn request_contains_signing_link_and_escaped_values() {
        let notifier = Arc::new(MockNotifier { sent: Mutex::new(vec![]), fail: false });
        let gateway = NotificationGateway::new(notifier.clone(), NotificationConfig::default());
        let (order, signer) = fixtures();

        gateway.request_signature(&order, &signer).await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "joao@example.com");
        assert!(sent[0].subject.ends_with("OS-7"));
        assert!(sent[0].html_body.contains(&format!("/sign/{}", signer.id)));
        assert!(sent[0].html_body.contains("Termo &lt;confidencial&gt;"));
        assert!(sent[0].html_body.contains("Paula &amp; Filhos"));
    }

    #[test]
    fn finalized_includes_link_only_when_present() {
        let notifier = Arc::new(MockNotifier { sent: Mutex::new(vec![]), fail: false });
        let gateway = NotificationGateway::new(notifier, NotificationConfig::default());
        let (order, signer) = fixtures();

        let with = gateway.compose(NoticeKind::Finalized, &order, &signer, Some("https://blob/x?sig=1"));
        let without = gateway.compose(NoticeKind::Finalized, &order, &signer, None);
        assert!(with.html_body.contains("https://blob/x?sig=1"));
        assert!(!without.html_body.contains("href"));
    }

    #[tokio::test]
    async fn delivery_failure_is_returned() {
        let notifier = Arc::new(MockNotifier { sent: Mutex::new(vec![]), fail: true });
        let gateway = NotificationGateway::new(notifier, NotificationConfig::default());
        let (order, signer) = fixtures();

        let err = gateway.cancelled(&order, &signer, Some("erro no contrato")).await.unwrap_err();
        assert!(matches!(err, OsignError::Notification { .. }));
    }
}
