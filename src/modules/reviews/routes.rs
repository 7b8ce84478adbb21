use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use verdict_authz::{author_or_staff, Access};
use verdict_http::{
    extract::{ApiPath, ApiQuery, Deferred},
    pagination::{Page, PageParams},
    AppError,
};

use super::models::{
    CommentPath, CommentRow, CommentView, NewComment, NewReview, ReviewPath, ReviewRow,
    ReviewView, UpdateComment, UpdateReview,
};
use super::repo;
use crate::extract::{enforce, AuthUser};
use crate::modules::titles::{models::title_not_found, repo as titles};
use crate::modules::users::models::User;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/titles/{title_id}/reviews/",
            get(list_reviews).post(create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/",
            get(get_review).patch(update_review).delete(delete_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/",
            get(list_comments).post(create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}/",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
        .with_state(state)
}

async fn list_reviews(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiPath(title_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<ReviewView>>, AppError> {
    let page = state.page(params)?;
    if !titles::exists(&state.db, title_id).await? {
        return Err(title_not_found(title_id));
    }

    let (reviews, count) = repo::list_reviews(&state.db, title_id, page).await?;
    Ok(Json(Page::new(reviews, count, page, &uri)?.map(ReviewView::from)))
}

/// One review per author and title: checked up front and backed by the
/// `UNIQUE (author_id, title_id)` constraint for concurrent submissions.
async fn create_review(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(title_id): ApiPath<i64>,
    body: Deferred<NewReview>,
) -> Result<(StatusCode, Json<ReviewView>), AppError> {
    let mut tx = state.db.begin().await?;
    if !titles::exists(&mut *tx, title_id).await? {
        return Err(title_not_found(title_id));
    }
    let body = body.into_valid()?;
    if repo::author_has_reviewed(&mut *tx, title_id, caller.id).await? {
        return Err(already_reviewed());
    }
    let review_id = repo::insert_review(&mut *tx, title_id, caller.id, &body.text, body.score)
        .await
        .map_err(|err| {
            if verdict_db::is_unique_violation(&err) {
                already_reviewed()
            } else {
                err.into()
            }
        })?;
    let review = repo::find_review(&mut *tx, title_id, review_id)
        .await?
        .ok_or_else(|| review_not_found(review_id))?;
    tx.commit().await?;

    tracing::info!(
        title_id,
        review_id,
        author = %caller.username,
        score = body.score,
        "review created"
    );
    Ok((StatusCode::CREATED, Json(review.into())))
}

async fn get_review(
    State(state): State<AppState>,
    ApiPath(path): ApiPath<ReviewPath>,
) -> Result<Json<ReviewView>, AppError> {
    let review = load_review(&state, path).await?;
    Ok(Json(review.into()))
}

async fn update_review(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(path): ApiPath<ReviewPath>,
    changes: Deferred<UpdateReview>,
) -> Result<Json<ReviewView>, AppError> {
    let review = load_review(&state, path).await?;
    check_author_or_staff(&caller, Access::Update, review.author_id)?;
    let changes = changes.into_valid()?;

    repo::update_review(&state.db, review.id, changes.text.as_deref(), changes.score).await?;
    let review = load_review(&state, path).await?;
    Ok(Json(review.into()))
}

async fn delete_review(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(path): ApiPath<ReviewPath>,
) -> Result<StatusCode, AppError> {
    let review = load_review(&state, path).await?;
    check_author_or_staff(&caller, Access::Delete, review.author_id)?;

    repo::delete_review(&state.db, review.id).await?;
    tracing::info!(review_id = review.id, by = %caller.username, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_comments(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiPath(path): ApiPath<ReviewPath>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<CommentView>>, AppError> {
    let page = state.page(params)?;
    let review = load_review(&state, path).await?;

    let (comments, count) = repo::list_comments(&state.db, review.id, page).await?;
    Ok(Json(Page::new(comments, count, page, &uri)?.map(CommentView::from)))
}

async fn create_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(path): ApiPath<ReviewPath>,
    body: Deferred<NewComment>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let review = load_review(&state, path).await?;
    let body = body.into_valid()?;

    let comment_id = repo::insert_comment(&state.db, review.id, caller.id, &body.text).await?;
    let comment = repo::find_comment(&state.db, review.id, comment_id)
        .await?
        .ok_or_else(|| comment_not_found(comment_id))?;

    tracing::info!(review_id = review.id, comment_id, author = %caller.username, "comment created");
    Ok((StatusCode::CREATED, Json(comment.into())))
}

async fn get_comment(
    State(state): State<AppState>,
    ApiPath(path): ApiPath<CommentPath>,
) -> Result<Json<CommentView>, AppError> {
    let comment = load_comment(&state, path).await?;
    Ok(Json(comment.into()))
}

async fn update_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(path): ApiPath<CommentPath>,
    changes: Deferred<UpdateComment>,
) -> Result<Json<CommentView>, AppError> {
    let comment = load_comment(&state, path).await?;
    check_author_or_staff(&caller, Access::Update, comment.author_id)?;
    let changes = changes.into_valid()?;

    repo::update_comment(&state.db, comment.id, changes.text.as_deref()).await?;
    let comment = load_comment(&state, path).await?;
    Ok(Json(comment.into()))
}

async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(path): ApiPath<CommentPath>,
) -> Result<StatusCode, AppError> {
    let comment = load_comment(&state, path).await?;
    check_author_or_staff(&caller, Access::Delete, comment.author_id)?;

    repo::delete_comment(&state.db, comment.id).await?;
    tracing::info!(comment_id = comment.id, by = %caller.username, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn check_author_or_staff(caller: &User, access: Access, owner_id: i64) -> Result<(), AppError> {
    enforce(author_or_staff(access, Some(&caller.principal()), owner_id))
}

/// The review, provided it belongs to the title in the path.
async fn load_review(state: &AppState, path: ReviewPath) -> Result<ReviewRow, AppError> {
    if !titles::exists(&state.db, path.title_id).await? {
        return Err(title_not_found(path.title_id));
    }
    repo::find_review(&state.db, path.title_id, path.review_id)
        .await?
        .ok_or_else(|| review_not_found(path.review_id))
}

/// The comment, provided the whole path chain matches.
async fn load_comment(state: &AppState, path: CommentPath) -> Result<CommentRow, AppError> {
    let review = load_review(
        state,
        ReviewPath {
            title_id: path.title_id,
            review_id: path.review_id,
        },
    )
    .await?;
    repo::find_comment(&state.db, review.id, path.comment_id)
        .await?
        .ok_or_else(|| comment_not_found(path.comment_id))
}

fn already_reviewed() -> AppError {
    AppError::invalid_field("title", "you have already reviewed this title")
}

fn review_not_found(review_id: i64) -> AppError {
    AppError::not_found(format!("review {review_id} not found"))
}

fn comment_not_found(comment_id: i64) -> AppError {
    AppError::not_found(format!("comment {comment_id} not found"))
}
