use anyhow::Context;
use axum::{extract::State, routing::post, Json, Router};
use time::OffsetDateTime;
use verdict_http::{extract::Payload, AppError};

use super::models::{SignupRequest, TokenRequest, TokenResponse};
use crate::mail::Email;
use crate::modules::users::{
    models::{check_username, User},
    repo::{self, NewUser},
};
use crate::state::AppState;

const CODE_SUBJECT: &str = "Your confirmation code";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/signup/", post(signup))
        .route("/auth/token/", post(token))
        .with_state(state)
}

/// Get or create the account for (username, email) and mail it a fresh
/// confirmation code. Repeating the request re-sends a code.
async fn signup(
    State(state): State<AppState>,
    Payload(body): Payload<SignupRequest>,
) -> Result<Json<SignupRequest>, AppError> {
    check_username(&body.username)?;
    let user = get_or_create(&state, &body).await?;

    let code = state.codes.make(&user.code_subject());
    state
        .mailer
        .send(Email {
            from: state.mail_from.to_string(),
            to: user.email.clone(),
            subject: CODE_SUBJECT.to_string(),
            body: format!("Confirmation code for {}: {code}", user.username),
        })
        .await
        .context("failed to deliver confirmation code")?;

    tracing::info!(username = %user.username, "confirmation code issued");
    Ok(Json(body))
}

async fn get_or_create(state: &AppState, body: &SignupRequest) -> Result<User, AppError> {
    if let Some(user) = repo::find_by_username(&state.db, &body.username).await? {
        if user.email == body.email {
            return Ok(user);
        }
        return Err(AppError::invalid_field(
            "username",
            "this username is registered with a different email",
        ));
    }
    if repo::find_by_email(&state.db, &body.email).await?.is_some() {
        return Err(AppError::invalid_field(
            "email",
            "this email is registered with a different username",
        ));
    }

    match repo::insert(&state.db, &NewUser::member(&body.username, &body.email)).await {
        Ok(user) => {
            tracing::info!(username = %user.username, "account created by signup");
            Ok(user)
        }
        // Lost a race with a concurrent signup for the same account.
        Err(err) if verdict_db::is_unique_violation(&err) => Err(AppError::invalid_field(
            "username",
            "username or email already in use",
        )),
        Err(err) => Err(err.into()),
    }
}

/// Exchange (username, confirmation code) for an access token.
async fn token(
    State(state): State<AppState>,
    Payload(body): Payload<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = repo::find_by_username(&state.db, &body.username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user '{}' not found", body.username)))?;

    if !state.codes.check(&user.code_subject(), &body.confirmation_code) {
        tracing::info!(username = %user.username, "confirmation code rejected");
        return Err(invalid_code());
    }

    let now = OffsetDateTime::now_utc();
    if !repo::record_login(&state.db, user.id, user.last_login, now).await? {
        tracing::info!(username = %user.username, "confirmation code already exchanged");
        return Err(invalid_code());
    }
    let token = state.tokens.issue(user.id);

    tracing::info!(username = %user.username, "access token issued");
    Ok(Json(TokenResponse { token }))
}

fn invalid_code() -> AppError {
    AppError::invalid_field("confirmation_code", "invalid or expired confirmation code")
}
