//! Queries shared by categories and genres. Table names come from the closed
//! [`Taxonomy`] enum, never from input.

use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use verdict_db::Db;
use verdict_http::pagination::PageRequest;

use super::models::{Taxonomy, Term};

/// Page ordered by name; `search` matches the whole name, ignoring case.
pub async fn list(
    db: &Db,
    taxonomy: Taxonomy,
    search: Option<&str>,
    page: PageRequest,
) -> Result<(Vec<Term>, i64), sqlx::Error> {
    let table = taxonomy.table();
    let mut count = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {table}"));
    let mut rows = QueryBuilder::<Sqlite>::new(format!("SELECT id, name, slug FROM {table}"));
    if let Some(search) = search {
        for query in [&mut count, &mut rows] {
            query
                .push(" WHERE name = ")
                .push_bind(search.to_string())
                .push(" COLLATE NOCASE");
        }
    }
    rows.push(" ORDER BY name, id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let (total,): (i64,) = count.build_query_as().fetch_one(db).await?;
    let terms = rows.build_query_as::<Term>().fetch_all(db).await?;
    Ok((terms, total))
}

pub async fn insert<'e, E>(
    executor: E,
    taxonomy: Taxonomy,
    name: &str,
    slug: &str,
) -> Result<Term, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO {} (name, slug) VALUES (?, ?) RETURNING id, name, slug",
        taxonomy.table()
    );
    sqlx::query_as::<_, Term>(&sql)
        .bind(name)
        .bind(slug)
        .fetch_one(executor)
        .await
}

pub async fn find_by_slug<'e, E>(
    executor: E,
    taxonomy: Taxonomy,
    slug: &str,
) -> Result<Option<Term>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT id, name, slug FROM {} WHERE slug = ?", taxonomy.table());
    sqlx::query_as::<_, Term>(&sql)
        .bind(slug)
        .fetch_optional(executor)
        .await
}

/// Terms matching any of `slugs`, in no particular order.
pub async fn find_by_slugs<'e, E>(
    executor: E,
    taxonomy: Taxonomy,
    slugs: &[String],
) -> Result<Vec<Term>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    if slugs.is_empty() {
        return Ok(Vec::new());
    }
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT id, name, slug FROM {} WHERE slug IN (",
        taxonomy.table()
    ));
    let mut separated = query.separated(", ");
    for slug in slugs {
        separated.push_bind(slug.clone());
    }
    separated.push_unseparated(")");
    query.build_query_as::<Term>().fetch_all(executor).await
}

pub async fn find_by_ids<'e, E>(
    executor: E,
    taxonomy: Taxonomy,
    ids: &[i64],
) -> Result<Vec<Term>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT id, name, slug FROM {} WHERE id IN (",
        taxonomy.table()
    ));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    query.build_query_as::<Term>().fetch_all(executor).await
}

/// Returns whether a row was deleted.
pub async fn delete_by_slug<'e, E>(
    executor: E,
    taxonomy: Taxonomy,
    slug: &str,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("DELETE FROM {} WHERE slug = ?", taxonomy.table());
    let result = sqlx::query(&sql).bind(slug).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}
