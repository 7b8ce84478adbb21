use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use verdict_authz::admin_only;
use verdict_http::{
    error::field_error,
    extract::{ApiPath, ApiQuery, Deferred, Payload},
    pagination::{Page, PageParams},
    AppError,
};

use super::models::{
    check_username, CreateUser, UpdateProfile, UpdateUser, User, UserSearch, UserView,
};
use super::repo::{self, NewUser};
use crate::extract::{enforce, AuthUser};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route("/users/me/", get(get_me).patch(update_me))
        .route(
            "/users/{username}/",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .with_state(state)
}

fn require_admin(caller: &User) -> Result<(), AppError> {
    enforce(admin_only(Some(&caller.principal())))
}

async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    OriginalUri(uri): OriginalUri,
    ApiQuery(search): ApiQuery<UserSearch>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<UserView>>, AppError> {
    require_admin(&caller)?;
    let page = state.page(params)?;

    let search = search.search.as_deref().filter(|term| !term.is_empty());
    let (users, count) = repo::list(&state.db, search, page).await?;
    let page = Page::new(users, count, page, &uri)?.map(UserView::from);
    Ok(Json(page))
}

async fn create_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    body: Deferred<CreateUser>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    require_admin(&caller)?;
    let body = body.into_valid()?;
    check_username(&body.username)?;
    ensure_available(&state, Some(&body.username), Some(&body.email), None).await?;

    let new_user = NewUser {
        username: &body.username,
        email: &body.email,
        first_name: &body.first_name,
        last_name: &body.last_name,
        bio: &body.bio,
        role: body.role,
        is_superuser: false,
    };
    let user = repo::insert(&state.db, &new_user)
        .await
        .map_err(taken_on_conflict)?;

    tracing::info!(
        username = %user.username,
        role = %user.role,
        by = %caller.username,
        "user created"
    );
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<UserView>, AppError> {
    require_admin(&caller)?;
    let user = load(&state, &username).await?;
    Ok(Json(user.into()))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(username): ApiPath<String>,
    changes: Deferred<UpdateUser>,
) -> Result<Json<UserView>, AppError> {
    require_admin(&caller)?;
    let user = load(&state, &username).await?;
    let changes = changes.into_valid()?;
    let updated = apply_update(&state, &user, &changes).await?;

    if updated.role != user.role {
        tracing::info!(
            username = %updated.username,
            from = %user.role,
            to = %updated.role,
            "role changed"
        );
    }
    Ok(Json(updated.into()))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(username): ApiPath<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    if !repo::delete_by_username(&state.db, &username).await? {
        return Err(AppError::not_found(format!("user '{username}' not found")));
    }

    tracing::info!(%username, by = %caller.username, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_me(AuthUser(caller): AuthUser) -> Json<UserView> {
    Json(caller.into())
}

async fn update_me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Payload(profile): Payload<UpdateProfile>,
) -> Result<Json<UserView>, AppError> {
    let updated = apply_update(&state, &caller, &profile.into()).await?;
    Ok(Json(updated.into()))
}

async fn load(state: &AppState, username: &str) -> Result<User, AppError> {
    repo::find_by_username(&state.db, username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user '{username}' not found")))
}

async fn apply_update(
    state: &AppState,
    user: &User,
    changes: &UpdateUser,
) -> Result<User, AppError> {
    if let Some(username) = &changes.username {
        check_username(username)?;
    }
    ensure_available(
        state,
        changes.username.as_deref(),
        changes.email.as_deref(),
        Some(user.id),
    )
    .await?;

    repo::update(&state.db, user.id, changes)
        .await
        .map_err(taken_on_conflict)
}

/// Username and email must not belong to another account.
async fn ensure_available(
    state: &AppState,
    username: Option<&str>,
    email: Option<&str>,
    owner: Option<i64>,
) -> Result<(), AppError> {
    let mut details = Vec::new();

    if let Some(username) = username {
        if let Some(existing) = repo::find_by_username(&state.db, username).await? {
            if Some(existing.id) != owner {
                details.push(field_error("username", "a user with this username already exists"));
            }
        }
    }
    if let Some(email) = email {
        if let Some(existing) = repo::find_by_email(&state.db, email).await? {
            if Some(existing.id) != owner {
                details.push(field_error("email", "a user with this email already exists"));
            }
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(details, "account details are already in use"))
    }
}

/// A unique violation that slipped past `ensure_available` is still a
/// validation error for the client.
fn taken_on_conflict(err: sqlx::Error) -> AppError {
    if verdict_db::is_unique_violation(&err) {
        AppError::validation(
            vec![field_error("username", "username or email already in use")],
            "account details are already in use",
        )
    } else {
        err.into()
    }
}
