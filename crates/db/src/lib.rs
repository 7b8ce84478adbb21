//! SQLite connection pool and module migration runner.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use time::OffsetDateTime;
use verdict_kernel::settings::DatabaseSettings;
use verdict_kernel::Migration;

/// Shared connection pool handed to every module.
pub type Db = SqlitePool;

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database url '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to connect to '{url}'")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration '{id}' failed")]
    Migration {
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Open a pool for the configured database, creating the file if needed.
///
/// In-memory databases are private to a single connection, so the pool is
/// pinned to one long-lived connection for them.
pub async fn connect(settings: &DatabaseSettings) -> Result<Db, DbError> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .map_err(|source| DbError::InvalidUrl {
            url: settings.url.clone(),
            source,
        })?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if is_memory_url(&settings.url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(settings.max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|source| DbError::Connect {
            url: settings.url.clone(),
            source,
        })?;

    tracing::info!(target: "verdict-db", url = %settings.url, "database pool ready");
    Ok(pool)
}

/// Open a pool without touching the database until first use.
pub fn connect_lazy(settings: &DatabaseSettings) -> Result<Db, DbError> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .map_err(|source| DbError::InvalidUrl {
            url: settings.url.clone(),
            source,
        })?
        .foreign_keys(true);
    Ok(SqlitePoolOptions::new()
        .max_connections(1)
        .connect_lazy_with(options))
}

/// Fresh private in-memory database.
pub async fn connect_in_memory() -> Result<Db, DbError> {
    connect(&DatabaseSettings {
        url: MEMORY_URL.to_string(),
        max_connections: 1,
    })
    .await
}

fn is_memory_url(url: &str) -> bool {
    url == MEMORY_URL || url.contains(":memory:") || url.contains("mode=memory")
}

/// Apply every migration that has not been recorded yet, in the given order.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row. Returns the keys (`module/id`) of the migrations applied by this call.
pub async fn apply_migrations(
    db: &Db,
    migrations: &[(String, Migration)],
) -> Result<Vec<String>, DbError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id         TEXT PRIMARY KEY NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )
    .execute(db)
    .await?;

    let mut applied = Vec::new();
    for (module, migration) in migrations {
        let key = format!("{module}/{}", migration.id);

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM _migrations WHERE id = ?")
            .bind(&key)
            .fetch_optional(db)
            .await?;
        if exists.is_some() {
            tracing::debug!(target: "verdict-db", migration = %key, "already applied");
            continue;
        }

        let mut tx = db.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|source| DbError::Migration {
                id: key.clone(),
                source,
            })?;
        sqlx::query("INSERT INTO _migrations (id, applied_at) VALUES (?, ?)")
            .bind(&key)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(target: "verdict-db", migration = %key, "migration applied");
        applied.push(key);
    }

    Ok(applied)
}

/// Whether the error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(id: &'static str, up: &'static str) -> (String, Migration) {
        ("things".to_string(), Migration { id, up })
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let db = connect_in_memory().await.unwrap();
        let migrations = vec![
            migration("001_init", "CREATE TABLE things (id INTEGER PRIMARY KEY, name TEXT UNIQUE);"),
            migration("002_index", "CREATE INDEX things_name ON things (name);"),
        ];

        let first = apply_migrations(&db, &migrations).await.unwrap();
        assert_eq!(first, ["things/001_init", "things/002_index"]);

        let second = apply_migrations(&db, &migrations).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let db = connect_in_memory().await.unwrap();
        let migrations = vec![migration("001_broken", "CREATE TABLE (;")];

        let err = apply_migrations(&db, &migrations).await.unwrap_err();
        assert!(matches!(err, DbError::Migration { .. }));

        let recorded: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(recorded.0, 0);
    }

    #[tokio::test]
    async fn unique_violation_is_detected() {
        let db = connect_in_memory().await.unwrap();
        apply_migrations(
            &db,
            &[migration("001_init", "CREATE TABLE things (name TEXT UNIQUE);")],
        )
        .await
        .unwrap();

        sqlx::query("INSERT INTO things (name) VALUES ('a')")
            .execute(&db)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO things (name) VALUES ('a')")
            .execute(&db)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let db = connect_in_memory().await.unwrap();
        apply_migrations(
            &db,
            &[migration(
                "001_init",
                "CREATE TABLE parent (id INTEGER PRIMARY KEY);
                 CREATE TABLE child (parent_id INTEGER NOT NULL REFERENCES parent (id));",
            )],
        )
        .await
        .unwrap();

        let result = sqlx::query("INSERT INTO child (parent_id) VALUES (42)")
            .execute(&db)
            .await;
        assert!(result.is_err());
    }
}
