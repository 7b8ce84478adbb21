use std::collections::HashMap;

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sqlx::SqliteConnection;
use verdict_authz::{admin_or_read_only, Access};
use verdict_http::{
    extract::{ApiPath, ApiQuery, Deferred},
    pagination::{Page, PageParams},
    AppError,
};

use super::models::{
    check_year, title_not_found, CreateTitle, TitleFilter, TitleRow, TitleView, UpdateTitle,
};
use super::repo::{self, NewTitle, TitleChanges};
use crate::extract::{enforce, Caller};
use crate::modules::taxonomy::{models::Taxonomy, repo as terms};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/titles/", get(list_titles).post(create_title))
        .route(
            "/titles/{title_id}/",
            get(get_title).patch(update_title).delete(delete_title),
        )
        .with_state(state)
}

async fn list_titles(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<TitleFilter>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<TitleView>>, AppError> {
    let page = state.page(params)?;
    let filter = filter.normalized();

    let (rows, count) = repo::list(&state.db, &filter, page).await?;
    let views = present(&state, rows).await?;
    Ok(Json(Page::new(views, count, page, &uri)?))
}

async fn create_title(
    State(state): State<AppState>,
    caller: Caller,
    body: Deferred<CreateTitle>,
) -> Result<(StatusCode, Json<TitleView>), AppError> {
    enforce(admin_or_read_only(Access::Create, caller.principal().as_ref()))?;
    let body = body.into_valid()?;
    check_year(body.year)?;

    let mut tx = state.db.begin().await?;
    let category_id = match &body.category {
        Some(slug) => Some(resolve_category(&mut tx, slug).await?),
        None => None,
    };
    let genre_ids = resolve_genres(&mut tx, &body.genre).await?;

    let new_title = NewTitle {
        name: &body.name,
        year: body.year,
        description: &body.description,
        category_id,
    };
    let id = repo::insert(&mut *tx, &new_title).await?;
    repo::set_genres(&mut tx, id, &genre_ids).await?;
    tx.commit().await?;

    tracing::info!(title_id = id, name = %body.name, "title created");
    let view = load(&state, id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_title(
    State(state): State<AppState>,
    ApiPath(title_id): ApiPath<i64>,
) -> Result<Json<TitleView>, AppError> {
    Ok(Json(load(&state, title_id).await?))
}

async fn update_title(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(title_id): ApiPath<i64>,
    changes: Deferred<UpdateTitle>,
) -> Result<Json<TitleView>, AppError> {
    enforce(admin_or_read_only(Access::Update, caller.principal().as_ref()))?;

    let mut tx = state.db.begin().await?;
    if !repo::exists(&mut *tx, title_id).await? {
        return Err(title_not_found(title_id));
    }
    let changes = changes.into_valid()?;
    if let Some(year) = changes.year {
        check_year(year)?;
    }
    let category_id = match &changes.category {
        Some(Some(slug)) => Some(Some(resolve_category(&mut tx, slug).await?)),
        Some(None) => Some(None),
        None => None,
    };
    let title_changes = TitleChanges {
        name: changes.name.as_deref(),
        year: changes.year,
        description: changes.description.as_deref(),
        category_id,
    };
    repo::update(&mut *tx, title_id, &title_changes).await?;
    if let Some(genre) = &changes.genre {
        let genre_ids = resolve_genres(&mut tx, genre).await?;
        repo::set_genres(&mut tx, title_id, &genre_ids).await?;
    }
    tx.commit().await?;

    Ok(Json(load(&state, title_id).await?))
}

async fn delete_title(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(title_id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    enforce(admin_or_read_only(Access::Delete, caller.principal().as_ref()))?;
    if !repo::delete(&state.db, title_id).await? {
        return Err(title_not_found(title_id));
    }

    tracing::info!(title_id, "title deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load(state: &AppState, title_id: i64) -> Result<TitleView, AppError> {
    let row = repo::find_by_id(&state.db, title_id)
        .await?
        .ok_or_else(|| title_not_found(title_id))?;
    let mut views = present(state, vec![row]).await?;
    views.pop().ok_or_else(|| title_not_found(title_id))
}

/// Attach categories and genres to a batch of rows, keeping row order.
async fn present(state: &AppState, rows: Vec<TitleRow>) -> Result<Vec<TitleView>, AppError> {
    let title_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut category_ids: Vec<i64> = rows.iter().filter_map(|row| row.category_id).collect();
    category_ids.sort_unstable();
    category_ids.dedup();

    let categories: HashMap<i64, _> =
        terms::find_by_ids(&state.db, Taxonomy::Categories, &category_ids)
            .await?
            .into_iter()
            .map(|term| (term.id, term))
            .collect();

    let mut genres: HashMap<i64, Vec<_>> = HashMap::new();
    for link in repo::genres_for(&state.db, &title_ids).await? {
        genres.entry(link.title_id).or_default().push(link.genre);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let category = row.category_id.and_then(|id| categories.get(&id).cloned());
            let genre = genres.remove(&row.id).unwrap_or_default();
            TitleView::new(row, category, genre)
        })
        .collect())
}

async fn resolve_category(conn: &mut SqliteConnection, slug: &str) -> Result<i64, AppError> {
    terms::find_by_slug(&mut *conn, Taxonomy::Categories, slug)
        .await?
        .map(|term| term.id)
        .ok_or_else(|| {
            AppError::invalid_field(
                "category",
                format!("category with slug '{slug}' does not exist"),
            )
        })
}

/// Genre ids for `slugs`, in request order without repeats.
async fn resolve_genres(
    conn: &mut SqliteConnection,
    slugs: &[String],
) -> Result<Vec<i64>, AppError> {
    let found = terms::find_by_slugs(&mut *conn, Taxonomy::Genres, slugs).await?;
    let by_slug: HashMap<&str, i64> = found
        .iter()
        .map(|term| (term.slug.as_str(), term.id))
        .collect();

    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let id = by_slug.get(slug.as_str()).copied().ok_or_else(|| {
            AppError::invalid_field("genre", format!("genre with slug '{slug}' does not exist"))
        })?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}
