//! Outgoing mail. Confirmation codes are the only thing the API sends.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;
use verdict_kernel::settings::{MailBackend, MailSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    fn render(&self, date: &str) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\nDate: {}\n\n{}\n",
            self.from, self.to, self.subject, date, self.body
        )
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Build the mailer selected in configuration.
pub fn from_settings(settings: &MailSettings) -> Arc<dyn Mailer> {
    match settings.backend {
        MailBackend::Log => Arc::new(LogMailer),
        MailBackend::File => Arc::new(FileMailer::new(settings.outbox_dir.clone())),
    }
}

/// Writes every message to the log instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        tracing::info!(
            target: "verdict::mail",
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "email sent"
        );
        Ok(())
    }
}

/// Drops each message into its own file under an outbox directory.
pub struct FileMailer {
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl Mailer for FileMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create outbox {}", self.dir.display()))?;

        let now = OffsetDateTime::now_utc();
        let path = self
            .dir
            .join(format!("{}-{}.eml", now.unix_timestamp(), Uuid::new_v4().simple()));
        let date = now.format(&Rfc3339).unwrap_or_default();
        tokio::fs::write(&path, email.render(&date))
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        tracing::debug!(
            target: "verdict::mail",
            path = %path.display(),
            to = %email.to,
            "email written"
        );
        Ok(())
    }
}

/// Keeps messages in memory; used by tests to read back confirmation codes.
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    /// Most recent message addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<Email> {
        self.sent().into_iter().rev().find(|email| email.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        self.outbox
            .lock()
            .map_err(|_| anyhow::anyhow!("outbox lock poisoned"))?
            .push(email);
        Ok(())
    }
}
