//! Stateless confirmation codes.
//!
//! A code is `<issued-at in base36>-<truncated HMAC>`. The MAC covers the
//! issue time and the parts of the account that change when the account is
//! used or edited, so a code stops verifying as soon as any of them moves
//! (including the `last_login` stamp written when a code is exchanged).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{digest::InvalidLength, Hmac, Mac};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};
use verdict_authz::Role;

type HmacSha256 = Hmac<Sha256>;

const DOMAIN: &[u8] = b"verdict.confirmation-code.v1";
const MAC_LEN: usize = 15;

/// Account state a code is bound to.
#[derive(Debug, Clone, Copy)]
pub struct CodeSubject<'a> {
    pub user_id: i64,
    pub username: &'a str,
    pub email: &'a str,
    pub role: Role,
    pub last_login: Option<OffsetDateTime>,
}

#[derive(Clone)]
pub struct ConfirmationCodes {
    mac: HmacSha256,
    ttl: Duration,
}

impl ConfirmationCodes {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
            ttl,
        })
    }

    pub fn make(&self, subject: &CodeSubject<'_>) -> String {
        self.make_at(subject, OffsetDateTime::now_utc())
    }

    pub fn make_at(&self, subject: &CodeSubject<'_>, now: OffsetDateTime) -> String {
        let issued = now.unix_timestamp();
        let digest = self.digest(subject, issued).finalize().into_bytes();
        format!(
            "{}-{}",
            to_base36(issued.unsigned_abs()),
            URL_SAFE_NO_PAD.encode(&digest[..MAC_LEN])
        )
    }

    pub fn check(&self, subject: &CodeSubject<'_>, code: &str) -> bool {
        self.check_at(subject, code, OffsetDateTime::now_utc())
    }

    pub fn check_at(&self, subject: &CodeSubject<'_>, code: &str, now: OffsetDateTime) -> bool {
        let Some((issued, mac)) = code.split_once('-') else {
            return false;
        };
        let Ok(issued) = u64::from_str_radix(issued, 36) else {
            return false;
        };
        let Ok(issued) = i64::try_from(issued) else {
            return false;
        };
        let age = now.unix_timestamp() - issued;
        if age < 0 || age > self.ttl.whole_seconds() {
            return false;
        }
        let Ok(mac) = URL_SAFE_NO_PAD.decode(mac) else {
            return false;
        };
        if mac.len() != MAC_LEN {
            return false;
        }
        self.digest(subject, issued).verify_truncated_left(&mac).is_ok()
    }

    fn digest(&self, subject: &CodeSubject<'_>, issued: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(DOMAIN);
        mac.update(&subject.user_id.to_be_bytes());
        for field in [subject.username, subject.email, subject.role.as_str()] {
            mac.update(field.as_bytes());
            mac.update(&[0]);
        }
        let last_login = subject
            .last_login
            .map_or(0, |at| at.unix_timestamp_nanos());
        mac.update(&last_login.to_be_bytes());
        mac.update(&issued.to_be_bytes());
        mac
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
