use std::sync::Arc;

use anyhow::Context;
use time::Duration;
use verdict_db::Db;
use verdict_http::pagination::{PageParams, PageRequest};
use verdict_http::AppError;
use verdict_kernel::Settings;

use crate::mail::Mailer;
use crate::security::{ConfirmationCodes, TokenSigner};

/// Shared handles every module's handlers run against.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub tokens: Arc<TokenSigner>,
    pub codes: Arc<ConfirmationCodes>,
    pub mailer: Arc<dyn Mailer>,
    pub mail_from: Arc<str>,
    pub page_size: u32,
}

impl AppState {
    pub fn new(settings: &Settings, db: Db, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let secret = settings.auth.secret_key.as_bytes();
        let tokens = TokenSigner::new(
            secret,
            Duration::seconds(ttl_secs(settings.auth.access_token_ttl_secs)),
        )
        .context("invalid token signing key")?;
        let codes = ConfirmationCodes::new(
            secret,
            Duration::seconds(ttl_secs(settings.auth.confirmation_code_ttl_secs)),
        )
        .context("invalid confirmation code key")?;

        Ok(Self {
            db,
            tokens: Arc::new(tokens),
            codes: Arc::new(codes),
            mailer,
            mail_from: Arc::from(settings.mail.from_address.as_str()),
            page_size: settings.api.page_size,
        })
    }

    pub fn page(&self, params: PageParams) -> Result<PageRequest, AppError> {
        PageRequest::new(params, self.page_size)
    }
}

fn ttl_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
