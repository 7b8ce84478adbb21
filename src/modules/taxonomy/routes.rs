use axum::{
    extract::{FromRef, OriginalUri, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use verdict_authz::{admin_or_read_only, Access};
use verdict_http::{
    error::field_error,
    extract::{ApiPath, ApiQuery, Deferred},
    pagination::{Page, PageParams},
    AppError,
};

use super::models::{NewTerm, Taxonomy, Term, TermSearch};
use super::repo;
use crate::extract::{enforce, Caller};
use crate::state::AppState;

/// Handler state: the shared app state plus which vocabulary is served.
#[derive(Clone)]
pub struct TermsState {
    app: AppState,
    taxonomy: Taxonomy,
}

impl FromRef<TermsState> for AppState {
    fn from_ref(state: &TermsState) -> Self {
        state.app.clone()
    }
}

pub fn router(app: AppState, taxonomy: Taxonomy) -> Router {
    let collection = format!("/{}/", taxonomy.table());
    let item = format!("/{}/{{slug}}/", taxonomy.table());

    Router::new()
        .route(&collection, get(list_terms).post(create_term))
        .route(&item, delete(delete_term))
        .with_state(TermsState { app, taxonomy })
}

async fn list_terms(
    State(TermsState { app, taxonomy }): State<TermsState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(search): ApiQuery<TermSearch>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<Term>>, AppError> {
    let page = app.page(params)?;
    let search = search.search.as_deref().filter(|term| !term.is_empty());

    let (terms, count) = repo::list(&app.db, taxonomy, search, page).await?;
    Ok(Json(Page::new(terms, count, page, &uri)?))
}

async fn create_term(
    State(TermsState { app, taxonomy }): State<TermsState>,
    caller: Caller,
    body: Deferred<NewTerm>,
) -> Result<(StatusCode, Json<Term>), AppError> {
    enforce(admin_or_read_only(Access::Create, caller.principal().as_ref()))?;
    let body = body.into_valid()?;

    if repo::find_by_slug(&app.db, taxonomy, &body.slug).await?.is_some() {
        return Err(slug_taken(taxonomy));
    }
    let term = repo::insert(&app.db, taxonomy, &body.name, &body.slug)
        .await
        .map_err(|err| {
            if verdict_db::is_unique_violation(&err) {
                slug_taken(taxonomy)
            } else {
                err.into()
            }
        })?;

    tracing::info!(kind = taxonomy.singular(), slug = %term.slug, "term created");
    Ok((StatusCode::CREATED, Json(term)))
}

async fn delete_term(
    State(TermsState { app, taxonomy }): State<TermsState>,
    caller: Caller,
    ApiPath(slug): ApiPath<String>,
) -> Result<StatusCode, AppError> {
    enforce(admin_or_read_only(Access::Delete, caller.principal().as_ref()))?;

    if !repo::delete_by_slug(&app.db, taxonomy, &slug).await? {
        return Err(AppError::not_found(format!(
            "{} '{slug}' not found",
            taxonomy.singular()
        )));
    }

    tracing::info!(kind = taxonomy.singular(), %slug, "term deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn slug_taken(taxonomy: Taxonomy) -> AppError {
    let message = format!("a {} with this slug already exists", taxonomy.singular());
    AppError::validation(vec![field_error("slug", message)], "slug already in use")
}
