//! Roles and the access predicates that gate every write in the API.
//!
//! Every check here is a pure function of the requested [`Access`], the
//! calling [`Principal`] (if any) and, for owned resources, the owner's id.
//! Callers translate the resulting [`Decision`] into an HTTP response.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account role. Stored and serialized in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role '{0}'; expected user/moderator/admin")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = RoleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The authenticated caller as far as access checks are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
    pub is_superuser: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }

    /// Admins and moderators may edit content they do not own.
    pub fn is_staff(&self) -> bool {
        self.is_admin() || self.is_moderator()
    }
}

/// The kind of operation being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Create,
    Update,
    Delete,
}

impl Access {
    pub fn is_safe(self) -> bool {
        self == Access::Read
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No credentials were presented for an operation that needs them.
    Unauthenticated,
    /// Credentials were presented but do not grant the operation.
    Forbidden,
}

/// Catalog resources (categories, genres, titles): anyone may read, only
/// admins may write.
pub fn admin_or_read_only(access: Access, caller: Option<&Principal>) -> Decision {
    if access.is_safe() {
        return Decision::Allow;
    }
    admin_only(caller)
}

/// User administration: admins only, for every operation.
pub fn admin_only(caller: Option<&Principal>) -> Decision {
    match caller {
        None => Decision::Unauthenticated,
        Some(principal) if principal.is_admin() => Decision::Allow,
        Some(principal) => {
            tracing::debug!(
                user_id = principal.user_id,
                role = %principal.role,
                "admin access denied"
            );
            Decision::Forbidden
        }
    }
}

/// Any authenticated caller.
pub fn authenticated(caller: Option<&Principal>) -> Decision {
    match caller {
        Some(_) => Decision::Allow,
        None => Decision::Unauthenticated,
    }
}

/// Reviews and comments: anyone may read, any authenticated caller may
/// create, and only the author or staff may update or delete.
///
/// `owner_id` is the author of the targeted resource; it is ignored for
/// reads and creates.
pub fn author_or_staff(access: Access, caller: Option<&Principal>, owner_id: i64) -> Decision {
    match access {
        Access::Read => Decision::Allow,
        Access::Create => authenticated(caller),
        Access::Update | Access::Delete => match caller {
            None => Decision::Unauthenticated,
            Some(principal) if principal.user_id == owner_id || principal.is_staff() => {
                Decision::Allow
            }
            Some(_) => Decision::Forbidden,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(user_id: i64, role: Role) -> Principal {
        Principal {
            user_id,
            role,
            is_superuser: false,
        }
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::User, Role::Moderator, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("root".parse::<Role>().is_err());
        assert_eq!(
            serde_json::to_value(Role::Moderator).unwrap(),
            serde_json::json!("moderator")
        );
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn superuser_counts_as_admin() {
        let root = Principal {
            user_id: 1,
            role: Role::User,
            is_superuser: true,
        };
        assert!(root.is_admin());
        assert!(root.is_staff());
    }

    #[test]
    fn catalog_reads_are_public() {
        assert_eq!(admin_or_read_only(Access::Read, None), Decision::Allow);
        let reader = principal(3, Role::User);
        assert_eq!(admin_or_read_only(Access::Read, Some(&reader)), Decision::Allow);
    }

    #[test]
    fn catalog_writes_need_admin() {
        let user = principal(2, Role::User);
        let moderator = principal(3, Role::Moderator);
        let admin = principal(4, Role::Admin);

        for access in [Access::Create, Access::Update, Access::Delete] {
            assert_eq!(admin_or_read_only(access, None), Decision::Unauthenticated);
            assert_eq!(admin_or_read_only(access, Some(&user)), Decision::Forbidden);
            assert_eq!(admin_or_read_only(access, Some(&moderator)), Decision::Forbidden);
            assert_eq!(admin_or_read_only(access, Some(&admin)), Decision::Allow);
        }
    }

    #[test]
    fn any_authenticated_user_may_create_reviews() {
        let user = principal(7, Role::User);
        assert_eq!(author_or_staff(Access::Create, Some(&user), 0), Decision::Allow);
        assert_eq!(author_or_staff(Access::Create, None, 0), Decision::Unauthenticated);
    }

    #[test]
    fn only_author_or_staff_may_modify() {
        let author = principal(10, Role::User);
        let stranger = principal(11, Role::User);
        let moderator = principal(12, Role::Moderator);
        let admin = principal(13, Role::Admin);

        for access in [Access::Update, Access::Delete] {
            assert_eq!(author_or_staff(access, Some(&author), 10), Decision::Allow);
            assert_eq!(author_or_staff(access, Some(&stranger), 10), Decision::Forbidden);
            assert_eq!(author_or_staff(access, Some(&moderator), 10), Decision::Allow);
            assert_eq!(author_or_staff(access, Some(&admin), 10), Decision::Allow);
            assert_eq!(author_or_staff(access, None, 10), Decision::Unauthenticated);
        }
    }

    #[test]
    fn user_administration_is_admin_only() {
        assert_eq!(admin_only(None), Decision::Unauthenticated);
        assert_eq!(admin_only(Some(&principal(1, Role::Moderator))), Decision::Forbidden);
        assert_eq!(admin_only(Some(&principal(1, Role::Admin))), Decision::Allow);
    }
}
