use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use verdict_authz::{Principal, Role};
use verdict_http::AppError;

use crate::security::CodeSubject;

/// Path segment that addresses the caller's own profile; never a username.
pub const RESERVED_USERNAME: &str = "me";

/// Account row.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_superuser: bool,
    pub last_login: Option<OffsetDateTime>,
    pub date_joined: OffsetDateTime,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            role: self.role,
            is_superuser: self.is_superuser,
        }
    }

    pub fn code_subject(&self) -> CodeSubject<'_> {
        CodeSubject {
            user_id: self.id,
            username: &self.username,
            email: &self.email,
            role: self.role,
            last_login: self.last_login,
        }
    }
}

/// Public representation of an account.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

/// Admin-created account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[garde(length(chars, min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: String,
    #[garde(email, length(chars, max = 254))]
    pub email: String,
    #[serde(default)]
    #[garde(length(chars, max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[garde(length(chars, max = 150))]
    pub last_name: String,
    #[serde(default)]
    #[garde(skip)]
    pub bio: String,
    #[serde(default)]
    #[garde(skip)]
    pub role: Role,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[garde(length(chars, min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: Option<String>,
    #[garde(email, length(chars, max = 254))]
    pub email: Option<String>,
    #[garde(length(chars, max = 150))]
    pub first_name: Option<String>,
    #[garde(length(chars, max = 150))]
    pub last_name: Option<String>,
    #[garde(skip)]
    pub bio: Option<String>,
    #[garde(skip)]
    pub role: Option<Role>,
}

/// Self-service profile update. The role cannot be changed here; a `role`
/// key in the body is ignored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfile {
    #[garde(length(chars, min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: Option<String>,
    #[garde(email, length(chars, max = 254))]
    pub email: Option<String>,
    #[garde(length(chars, max = 150))]
    pub first_name: Option<String>,
    #[garde(length(chars, max = 150))]
    pub last_name: Option<String>,
    #[garde(skip)]
    pub bio: Option<String>,
}

impl From<UpdateProfile> for UpdateUser {
    fn from(profile: UpdateProfile) -> Self {
        Self {
            username: profile.username,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            bio: profile.bio,
            role: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSearch {
    pub search: Option<String>,
}

/// Reject the reserved `me` username, in any letter case.
pub fn check_username(username: &str) -> Result<(), AppError> {
    if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(AppError::invalid_field(
            "username",
            format!("the username \"{RESERVED_USERNAME}\" is reserved"),
        ));
    }
    Ok(())
}
