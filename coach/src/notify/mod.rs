//! Operator notifications sent when generation is abandoned.
//!
//! [`Notifier`] is the email transport seam. [`ResendNotifier`] posts to an email HTTP
//! API; [`LogNotifier`] only logs and is used when no API key is configured.
//! [`OperatorAlert`] turns an error message into the fixed-recipient alert.
//! [`RecordingNotifier`] keeps sent notifications in memory for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Default email API base URL.
pub const DEFAULT_EMAIL_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email transport failed: {0}")]
    Transport(String),
    #[error("email API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// One outbound email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Fixed-recipient alert settings for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorAlert {
    pub to: String,
    pub from: String,
    pub component: String,
}

impl OperatorAlert {
    pub fn new(
        to: impl Into<String>,
        from: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            component: component.into(),
        }
    }

    pub fn subject(&self) -> String {
        format!("[coach] {} failed", self.component)
    }

    /// Alert carrying `message` as a single HTML paragraph.
    pub fn notification(&self, message: &str) -> Notification {
        Notification {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject(),
            html: format!("<p>{}</p>", message),
        }
    }
}

/// Logs notifications at `error` level instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::error!(
            to = %notification.to,
            subject = %notification.subject,
            html = %notification.html,
            "operator alert (not sent: no email API key)"
        );
        Ok(())
    }
}

/// Records notifications instead of sending them; optionally fails every send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records each notification, then returns a transport error.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        if self.fail {
            return Err(NotifyError::Transport("recording notifier set to fail".to_string()));
        }
        Ok(())
    }
}

/// Sends notifications through the Resend-compatible `POST {base}/emails` endpoint.
pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ResendNotifier {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_EMAIL_API_BASE)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn emails_url(&self) -> String {
        format!("{}/emails", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let url = self.emails_url();
        tracing::debug!(url = %url, to = %notification.to, subject = %notification.subject, "sending email");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
