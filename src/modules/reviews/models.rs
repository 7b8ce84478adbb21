use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Review row joined with its author's username.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub title_id: i64,
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub score: i64,
    pub pub_date: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub score: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

impl From<ReviewRow> for ReviewView {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            author: row.author,
            score: row.score,
            pub_date: row.pub_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReview {
    #[garde(length(chars, min = 1))]
    pub text: String,
    #[garde(range(min = 1, max = 10))]
    pub score: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReview {
    #[garde(length(chars, min = 1))]
    pub text: Option<String>,
    #[garde(range(min = 1, max = 10))]
    pub score: Option<i64>,
}

/// Comment row joined with its author's username.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub review_id: i64,
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            author: row.author,
            pub_date: row.pub_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComment {
    #[garde(length(chars, min = 1))]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateComment {
    #[garde(length(chars, min = 1))]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReviewPath {
    pub title_id: i64,
    pub review_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CommentPath {
    pub title_id: i64,
    pub review_id: i64,
    pub comment_id: i64,
}
