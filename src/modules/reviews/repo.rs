//! Review and comment queries. Rows come back joined with the author's
//! username, which is how they are presented.

use sqlx::SqliteExecutor;
use time::OffsetDateTime;
use verdict_db::Db;
use verdict_http::pagination::PageRequest;

use super::models::{CommentRow, ReviewRow};

const SELECT_REVIEW: &str = "SELECT r.id, r.title_id, r.author_id, u.username AS author,
        r.text, r.score, r.pub_date
    FROM reviews r JOIN users u ON u.id = r.author_id";

const SELECT_COMMENT: &str = "SELECT c.id, c.review_id, c.author_id, u.username AS author,
        c.text, c.pub_date
    FROM comments c JOIN users u ON u.id = c.author_id";

/// Page of a title's reviews, newest first.
pub async fn list_reviews(
    db: &Db,
    title_id: i64,
    page: PageRequest,
) -> Result<(Vec<ReviewRow>, i64), sqlx::Error> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE title_id = ?")
        .bind(title_id)
        .fetch_one(db)
        .await?;
    let reviews = sqlx::query_as::<_, ReviewRow>(&format!(
        "{SELECT_REVIEW} WHERE r.title_id = ?
         ORDER BY r.pub_date DESC, r.id DESC LIMIT ? OFFSET ?"
    ))
    .bind(title_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(db)
    .await?;
    Ok((reviews, total))
}

/// A review, only if it belongs to `title_id`.
pub async fn find_review<'e, E>(
    executor: E,
    title_id: i64,
    review_id: i64,
) -> Result<Option<ReviewRow>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, ReviewRow>(&format!(
        "{SELECT_REVIEW} WHERE r.id = ? AND r.title_id = ?"
    ))
    .bind(review_id)
    .bind(title_id)
    .fetch_optional(executor)
    .await
}

pub async fn author_has_reviewed<'e, E>(
    executor: E,
    title_id: i64,
    author_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let found: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM reviews WHERE title_id = ? AND author_id = ?")
            .bind(title_id)
            .bind(author_id)
            .fetch_optional(executor)
            .await?;
    Ok(found.is_some())
}

/// Returns the new review's id.
pub async fn insert_review<'e, E>(
    executor: E,
    title_id: i64,
    author_id: i64,
    text: &str,
    score: i64,
) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO reviews (title_id, author_id, text, score, pub_date)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(title_id)
    .bind(author_id)
    .bind(text)
    .bind(score)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(executor)
    .await?;
    Ok(id)
}

pub async fn update_review<'e, E>(
    executor: E,
    review_id: i64,
    text: Option<&str>,
    score: Option<i64>,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "UPDATE reviews SET text = COALESCE(?, text), score = COALESCE(?, score) WHERE id = ?",
    )
    .bind(text)
    .bind(score)
    .bind(review_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_review<'e, E>(executor: E, review_id: i64) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("DELETE FROM reviews WHERE id = ?")
        .bind(review_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Page of a review's comments, newest first.
pub async fn list_comments(
    db: &Db,
    review_id: i64,
    page: PageRequest,
) -> Result<(Vec<CommentRow>, i64), sqlx::Error> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE review_id = ?")
        .bind(review_id)
        .fetch_one(db)
        .await?;
    let comments = sqlx::query_as::<_, CommentRow>(&format!(
        "{SELECT_COMMENT} WHERE c.review_id = ?
         ORDER BY c.pub_date DESC, c.id DESC LIMIT ? OFFSET ?"
    ))
    .bind(review_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(db)
    .await?;
    Ok((comments, total))
}

/// A comment, only if it belongs to `review_id`.
pub async fn find_comment<'e, E>(
    executor: E,
    review_id: i64,
    comment_id: i64,
) -> Result<Option<CommentRow>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, CommentRow>(&format!(
        "{SELECT_COMMENT} WHERE c.id = ? AND c.review_id = ?"
    ))
    .bind(comment_id)
    .bind(review_id)
    .fetch_optional(executor)
    .await
}

/// Returns the new comment's id.
pub async fn insert_comment<'e, E>(
    executor: E,
    review_id: i64,
    author_id: i64,
    text: &str,
) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO comments (review_id, author_id, text, pub_date)
         VALUES (?, ?, ?, ?)
         RETURNING id",
    )
    .bind(review_id)
    .bind(author_id)
    .bind(text)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(executor)
    .await?;
    Ok(id)
}

pub async fn update_comment<'e, E>(
    executor: E,
    comment_id: i64,
    text: Option<&str>,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE comments SET text = COALESCE(?, text) WHERE id = ?")
        .bind(text)
        .bind(comment_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete_comment<'e, E>(executor: E, comment_id: i64) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(executor)
        .await?;
    Ok(())
}
