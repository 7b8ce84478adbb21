//! Title queries. The rating is computed on read from the review scores.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};
use time::OffsetDateTime;
use verdict_db::Db;
use verdict_http::pagination::PageRequest;

use super::models::{TitleFilter, TitleGenre, TitleRow};
use crate::utils::contains_pattern;

const SELECT_TITLE: &str = "SELECT t.id, t.name, t.year, t.description, t.category_id, t.created,
        (SELECT AVG(r.score) FROM reviews r WHERE r.title_id = t.id) AS rating
    FROM titles t";

/// Columns written on create.
#[derive(Debug, Clone)]
pub struct NewTitle<'a> {
    pub name: &'a str,
    pub year: i32,
    pub description: &'a str,
    pub category_id: Option<i64>,
}

/// Columns written on update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TitleChanges<'a> {
    pub name: Option<&'a str>,
    pub year: Option<i32>,
    pub description: Option<&'a str>,
    /// `Some(None)` clears the category.
    pub category_id: Option<Option<i64>>,
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &TitleFilter) {
    let mut clause = " WHERE ";
    if let Some(category) = &filter.category {
        query
            .push(clause)
            .push("t.category_id IN (SELECT id FROM categories WHERE slug = ")
            .push_bind(category.clone())
            .push(")");
        clause = " AND ";
    }
    if let Some(genre) = &filter.genre {
        query
            .push(clause)
            .push(
                "EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
                 WHERE tg.title_id = t.id AND g.slug = ",
            )
            .push_bind(genre.clone())
            .push(")");
        clause = " AND ";
    }
    if let Some(name) = &filter.name {
        query
            .push(clause)
            .push("t.name LIKE ")
            .push_bind(contains_pattern(name))
            .push(" ESCAPE '\\'");
        clause = " AND ";
    }
    if let Some(year) = filter.year {
        query.push(clause).push("t.year = ").push_bind(year);
    }
}

/// Page of titles, newest first.
pub async fn list(
    db: &Db,
    filter: &TitleFilter,
    page: PageRequest,
) -> Result<(Vec<TitleRow>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM titles t");
    push_filters(&mut count, filter);

    let mut rows = QueryBuilder::<Sqlite>::new(SELECT_TITLE);
    push_filters(&mut rows, filter);
    rows.push(" ORDER BY t.created DESC, t.id DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let (total,): (i64,) = count.build_query_as().fetch_one(db).await?;
    let titles = rows.build_query_as::<TitleRow>().fetch_all(db).await?;
    Ok((titles, total))
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<TitleRow>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, TitleRow>(&format!("{SELECT_TITLE} WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn exists<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM titles WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}

/// Returns the new title's id.
pub async fn insert<'e, E>(executor: E, title: &NewTitle<'_>) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO titles (name, year, description, category_id, created)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(title.name)
    .bind(title.year)
    .bind(title.description)
    .bind(title.category_id)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(executor)
    .await?;
    Ok(id)
}

/// Returns whether the title exists.
pub async fn update<'e, E>(
    executor: E,
    id: i64,
    changes: &TitleChanges<'_>,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE titles SET
            name        = COALESCE(?, name),
            year        = COALESCE(?, year),
            description = COALESCE(?, description),
            category_id = CASE WHEN ? THEN ? ELSE category_id END
         WHERE id = ?",
    )
    .bind(changes.name)
    .bind(changes.year)
    .bind(changes.description)
    .bind(changes.category_id.is_some())
    .bind(changes.category_id.flatten())
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace the genre links of a title.
pub async fn set_genres(
    conn: &mut SqliteConnection,
    title_id: i64,
    genre_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
        .bind(title_id)
        .execute(&mut *conn)
        .await?;
    for genre_id in genre_ids {
        sqlx::query("INSERT OR IGNORE INTO title_genres (title_id, genre_id) VALUES (?, ?)")
            .bind(title_id)
            .bind(*genre_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Genres of every title in `title_ids`, ordered by genre name.
pub async fn genres_for<'e, E>(
    executor: E,
    title_ids: &[i64],
) -> Result<Vec<TitleGenre>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    if title_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT tg.title_id, g.id, g.name, g.slug
         FROM title_genres tg JOIN genres g ON g.id = tg.genre_id
         WHERE tg.title_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in title_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY g.name, g.id");
    query.build_query_as::<TitleGenre>().fetch_all(executor).await
}

/// Returns whether a row was deleted.
pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM titles WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
