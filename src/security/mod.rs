//! Credentials: signed bearer tokens and emailed confirmation codes.

pub mod codes;
pub mod tokens;

pub use codes::{CodeSubject, ConfirmationCodes};
pub use tokens::{Claims, TokenError, TokenSigner};
