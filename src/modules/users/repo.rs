//! Account queries.

use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use time::OffsetDateTime;
use verdict_authz::Role;
use verdict_db::Db;
use verdict_http::pagination::PageRequest;

use super::models::{UpdateUser, User};
use crate::utils::contains_pattern;

/// Columns needed to create an account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub bio: &'a str,
    pub role: Role,
    pub is_superuser: bool,
}

impl<'a> NewUser<'a> {
    /// A plain account as created by signup.
    pub fn member(username: &'a str, email: &'a str) -> Self {
        Self {
            username,
            email,
            first_name: "",
            last_name: "",
            bio: "",
            role: Role::User,
            is_superuser: false,
        }
    }
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_username<'e, E>(
    executor: E,
    username: &str,
) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(executor)
        .await
}

/// Page of accounts ordered by id, optionally filtered by a username substring.
pub async fn list(
    db: &Db,
    search: Option<&str>,
    page: PageRequest,
) -> Result<(Vec<User>, i64), sqlx::Error> {
    let pattern = search.map(contains_pattern);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
    let mut rows = QueryBuilder::<Sqlite>::new("SELECT * FROM users");
    if let Some(pattern) = &pattern {
        for query in [&mut count, &mut rows] {
            query
                .push(" WHERE username LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
    }
    rows.push(" ORDER BY id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let (total,): (i64,) = count.build_query_as().fetch_one(db).await?;
    let users = rows.build_query_as::<User>().fetch_all(db).await?;
    Ok((users, total))
}

pub async fn insert<'e, E>(executor: E, user: &NewUser<'_>) -> Result<User, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, first_name, last_name, bio, role, is_superuser, date_joined)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.bio)
    .bind(user.role.as_str())
    .bind(user.is_superuser)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(executor)
    .await
}

/// Apply the `Some` fields of `changes`.
pub async fn update<'e, E>(
    executor: E,
    id: i64,
    changes: &UpdateUser,
) -> Result<User, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "UPDATE users SET
            username   = COALESCE(?, username),
            email      = COALESCE(?, email),
            first_name = COALESCE(?, first_name),
            last_name  = COALESCE(?, last_name),
            bio        = COALESCE(?, bio),
            role       = COALESCE(?, role)
         WHERE id = ?
         RETURNING *",
    )
    .bind(changes.username.as_deref())
    .bind(changes.email.as_deref())
    .bind(changes.first_name.as_deref())
    .bind(changes.last_name.as_deref())
    .bind(changes.bio.as_deref())
    .bind(changes.role.map(Role::as_str))
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Grant admin rights and the superuser flag.
pub async fn promote_to_superuser<'e, E>(executor: E, id: i64) -> Result<User, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "UPDATE users SET role = 'admin', is_superuser = 1 WHERE id = ? RETURNING *",
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Stamp a successful code exchange. This also invalidates outstanding
/// confirmation codes for the account.
///
/// The stamp only lands if `last_login` still holds `previous`; returns
/// false when another exchange got there first.
pub async fn record_login<'e, E>(
    executor: E,
    id: i64,
    previous: Option<OffsetDateTime>,
    at: OffsetDateTime,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE users SET last_login = ? WHERE id = ? AND last_login IS ?")
        .bind(at)
        .bind(id)
        .bind(previous)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Returns whether a row was deleted.
pub async fn delete_by_username<'e, E>(executor: E, username: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM users WHERE username = ?")
        .bind(username)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
